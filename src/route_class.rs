use percent_encoding::percent_decode_str;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// The single page trainers wait on while their account is under review.
pub const PENDING_APPROVAL_PATH: &str = "/pending-approval";

/// RouteClass
///
/// The access tier a request path belongs to. Every path belongs to exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RouteClass {
    Public,
    AuthOnly,
    TrainerArea,
    AdminArea,
    PendingPage,
}

impl RouteClass {
    pub const ALL: [RouteClass; 5] = [
        RouteClass::Public,
        RouteClass::AuthOnly,
        RouteClass::TrainerArea,
        RouteClass::AdminArea,
        RouteClass::PendingPage,
    ];

    // Tie-break order when two routes of equal length match the same path.
    fn precedence(&self) -> u8 {
        match self {
            RouteClass::PendingPage => 4,
            RouteClass::AdminArea => 3,
            RouteClass::TrainerArea => 2,
            RouteClass::AuthOnly => 1,
            RouteClass::Public => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("route {0:?} must start with '/'")]
    NotAbsolute(String),
    #[error("the root path cannot be a protected route")]
    RootRoute,
    #[error("route {0:?} is listed more than once")]
    Duplicate(String),
}

/// normalize_path
///
/// Canonical form of a request path, computed once at the boundary:
/// query string and fragment removed, percent-escapes decoded, lowercased,
/// repeated slashes and `.` segments collapsed, `..` resolved against the
/// preceding segment, trailing slash dropped (the root stays `/`).
///
/// The static file server decodes escapes before it opens a file, so the
/// classifier must see the decoded path too or `/%63ms` would slip past as public.
pub fn normalize_path(raw: &str) -> String {
    let without_query = raw.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(without_query)
        .decode_utf8_lossy()
        .to_ascii_lowercase();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            // `..` above the root stays at the root.
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

/// RouteTable
///
/// The static route lists the classifier matches against. Entries are stored in
/// normalized form. The pending-approval page is fixed at [`PENDING_APPROVAL_PATH`].
#[derive(Debug, Clone)]
pub struct RouteTable {
    admin: Vec<String>,
    trainer: Vec<String>,
    auth_only: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RouteTable {
    /// The dashboard's built-in layout.
    pub fn standard() -> Self {
        Self {
            admin: vec!["/admin".to_string()],
            trainer: vec!["/cms".to_string()],
            auth_only: vec!["/login".to_string(), "/register".to_string()],
        }
    }

    /// new
    ///
    /// Builds a table from caller-supplied lists, normalizing every entry.
    /// Rejects relative entries, the root path, and anything listed twice
    /// (including the pending page, which is implicitly present).
    pub fn new<I, S>(admin: I, trainer: I, auth_only: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = vec![PENDING_APPROVAL_PATH.to_string()];

        let mut normalize_list = |routes: I| -> Result<Vec<String>, RouteTableError> {
            let mut out = Vec::new();
            for route in routes {
                let raw = route.as_ref().trim();
                if !raw.starts_with('/') {
                    return Err(RouteTableError::NotAbsolute(raw.to_string()));
                }
                let normalized = normalize_path(raw);
                if normalized == "/" {
                    return Err(RouteTableError::RootRoute);
                }
                if seen.contains(&normalized) {
                    return Err(RouteTableError::Duplicate(normalized));
                }
                seen.push(normalized.clone());
                out.push(normalized);
            }
            Ok(out)
        };

        let admin = normalize_list(admin)?;
        let trainer = normalize_list(trainer)?;
        let auth_only = normalize_list(auth_only)?;

        Ok(Self {
            admin,
            trainer,
            auth_only,
        })
    }

    /// Classifies a raw path, normalizing it first.
    pub fn classify(&self, raw_path: &str) -> RouteClass {
        self.classify_normalized(&normalize_path(raw_path))
    }

    /// classify_normalized
    ///
    /// Longest matching route wins. Unmatched paths are `Public`.
    pub fn classify_normalized(&self, path: &str) -> RouteClass {
        let lists = [
            (RouteClass::AdminArea, self.admin.as_slice()),
            (RouteClass::TrainerArea, self.trainer.as_slice()),
            (RouteClass::AuthOnly, self.auth_only.as_slice()),
        ];

        let mut best: Option<(usize, RouteClass)> = None;
        let pending = [PENDING_APPROVAL_PATH.to_string()];
        let candidates = lists
            .into_iter()
            .chain(std::iter::once((RouteClass::PendingPage, pending.as_slice())));

        for (class, routes) in candidates {
            for route in routes {
                if !matches_route(path, route) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((len, current)) => {
                        route.len() > len
                            || (route.len() == len && class.precedence() > current.precedence())
                    }
                };
                if better {
                    best = Some((route.len(), class));
                }
            }
        }

        best.map(|(_, class)| class).unwrap_or(RouteClass::Public)
    }

    pub fn admin_routes(&self) -> &[String] {
        &self.admin
    }

    pub fn trainer_routes(&self) -> &[String] {
        &self.trainer
    }

    pub fn auth_only_routes(&self) -> &[String] {
        &self.auth_only
    }
}

// Exact match, or a prefix match that ends on a segment boundary.
fn matches_route(path: &str, route: &str) -> bool {
    path == route
        || path
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/'))
}
