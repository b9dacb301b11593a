use std::{env, path::PathBuf};

use crate::route_class::{RouteTable, RouteTableError};

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local sign-in bypass and cookie security.
    pub env: Env,
    // Postgres connection string for the profile store. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Shared secret used to verify identity provider tokens presented at sign-in.
    pub identity_secret: String,
    // Secret used to sign and verify the session attribute cookie.
    pub session_secret: String,
    // Lifetime of an issued session cookie, in seconds.
    pub session_ttl_secs: u64,
    pub bind_addr: String,
    // Built dashboard bundle served behind the edge guard.
    pub frontend_dir: Option<PathBuf>,
    // Optional overrides for the protected route lists (comma separated in the environment).
    pub admin_routes: Option<Vec<String>>,
    pub trainer_routes: Option<Vec<String>>,
    pub auth_routes: Option<Vec<String>>,
}

/// Env
///
/// Defines the runtime context: local development utilities versus hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const LOCAL_IDENTITY_SECRET: &str = "local-identity-secret-value";
const LOCAL_SESSION_SECRET: &str = "local-session-secret-value";

impl Default for AppConfig {
    /// Non-panicking configuration for tests and scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            identity_secret: LOCAL_IDENTITY_SECRET.to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            bind_addr: "127.0.0.1:3000".to_string(),
            frontend_dir: None,
            admin_routes: None,
            trainer_routes: None,
            auth_routes: None,
        }
    }
}

fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and fails fast.
    ///
    /// # Panics
    /// Panics in production if `DATABASE_URL`, `IDENTITY_JWT_SECRET` or `SESSION_SECRET`
    /// is missing, and in any environment if `SESSION_TTL_SECS` is not a positive integer.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()).as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .expect("FATAL: SESSION_TTL_SECS must be a positive integer"),
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let frontend_dir = env::var("FRONTEND_DIR").ok().map(PathBuf::from);

        let (db_url, identity_secret, session_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("IDENTITY_JWT_SECRET")
                    .expect("FATAL: IDENTITY_JWT_SECRET must be set in production."),
                env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("IDENTITY_JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_IDENTITY_SECRET.to_string()),
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        Self {
            env,
            db_url,
            identity_secret,
            session_secret,
            session_ttl_secs,
            bind_addr,
            frontend_dir,
            admin_routes: list_var("ADMIN_ROUTES"),
            trainer_routes: list_var("TRAINER_ROUTES"),
            auth_routes: list_var("AUTH_ROUTES"),
        }
    }

    /// The route table after applying any overrides. Lists that are not overridden
    /// keep their standard contents.
    pub fn route_table(&self) -> Result<RouteTable, RouteTableError> {
        let standard = RouteTable::standard();
        let pick = |custom: &Option<Vec<String>>, default: &[String]| {
            custom.clone().unwrap_or_else(|| default.to_vec())
        };

        RouteTable::new(
            pick(&self.admin_routes, standard.admin_routes()),
            pick(&self.trainer_routes, standard.trainer_routes()),
            pick(&self.auth_routes, standard.auth_only_routes()),
        )
    }
}
