use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The closed set of account roles recognised by the dashboard. Raw role strings read
/// from the profile store or from session attributes are parsed into this enum exactly
/// once, at the boundary. Nothing past that point ever looks at the raw string again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Trainer,
    Student,
    Admin,
}

impl Role {
    /// Case-insensitive parse. Returns `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trainer" => Some(Role::Trainer),
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trainer => "trainer",
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// TrainerStatus
///
/// Lifecycle of a trainer account as set by platform review.
/// Only meaningful when the role is `Trainer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TrainerStatus {
    Pending,
    Active,
    Suspended,
    Rejected,
}

impl TrainerStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TrainerStatus::Pending),
            "active" => Some(TrainerStatus::Active),
            "suspended" => Some(TrainerStatus::Suspended),
            "rejected" => Some(TrainerStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainerStatus::Pending => "pending",
            TrainerStatus::Active => "active",
            TrainerStatus::Suspended => "suspended",
            TrainerStatus::Rejected => "rejected",
        }
    }
}

/// SignalAnomaly
///
/// Everything that can be wrong with the raw identity inputs. None of these are ever
/// surfaced as a failure of the evaluator: each one degrades to the most restrictive
/// signal that is still consistent with what we do know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalAnomaly {
    #[error("no session present")]
    MissingSession,
    #[error("unrecognised role {raw:?}")]
    UnknownRole { raw: Option<String> },
    #[error("unrecognised trainer status {raw:?}")]
    UnknownStatus { raw: Option<String> },
}

impl SignalAnomaly {
    /// The fail-closed signal for this anomaly.
    pub fn degrade(&self) -> IdentitySignal {
        match self {
            SignalAnomaly::MissingSession | SignalAnomaly::UnknownRole { .. } => {
                IdentitySignal::anonymous()
            }
            SignalAnomaly::UnknownStatus { .. } => {
                IdentitySignal::trainer(TrainerStatus::Pending)
            }
        }
    }
}

/// IdentitySignal
///
/// The normalized identity inputs for one policy evaluation. Produced fresh on every
/// evaluation and never persisted.
///
/// Invariant: `status` is `Some` if and only if `role == Some(Role::Trainer)`. The fields
/// are private so the only way to build a signal is through the constructors below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct IdentitySignal {
    session_present: bool,
    role: Option<Role>,
    status: Option<TrainerStatus>,
}

impl IdentitySignal {
    pub fn anonymous() -> Self {
        Self {
            session_present: false,
            role: None,
            status: None,
        }
    }

    pub fn trainer(status: TrainerStatus) -> Self {
        Self {
            session_present: true,
            role: Some(Role::Trainer),
            status: Some(status),
        }
    }

    pub fn admin() -> Self {
        Self {
            session_present: true,
            role: Some(Role::Admin),
            status: None,
        }
    }

    pub fn student() -> Self {
        Self {
            session_present: true,
            role: Some(Role::Student),
            status: None,
        }
    }

    /// inspect
    ///
    /// Strict classification: reports the first anomaly found instead of degrading.
    ///
    /// A trainer with no status at all is treated the same as one with an unknown status
    /// (legacy profiles were created before the status field existed). A status attached
    /// to a non-trainer role is ignored.
    pub fn inspect(
        session_present: bool,
        raw_role: Option<&str>,
        raw_status: Option<&str>,
    ) -> Result<Self, SignalAnomaly> {
        if !session_present {
            return Err(SignalAnomaly::MissingSession);
        }

        let role = raw_role
            .and_then(Role::parse)
            .ok_or_else(|| SignalAnomaly::UnknownRole {
                raw: raw_role.map(str::to_string),
            })?;

        match role {
            Role::Trainer => {
                let status = raw_status.and_then(TrainerStatus::parse).ok_or_else(|| {
                    SignalAnomaly::UnknownStatus {
                        raw: raw_status.map(str::to_string),
                    }
                })?;
                Ok(Self::trainer(status))
            }
            Role::Admin => Ok(Self::admin()),
            Role::Student => Ok(Self::student()),
        }
    }

    /// classify
    ///
    /// Lenient classification used by both evaluation points. Never fails: any anomaly
    /// is logged and replaced by its fail-closed signal.
    pub fn classify(
        session_present: bool,
        raw_role: Option<&str>,
        raw_status: Option<&str>,
    ) -> Self {
        match Self::inspect(session_present, raw_role, raw_status) {
            Ok(signal) => signal,
            Err(SignalAnomaly::MissingSession) => Self::anonymous(),
            Err(anomaly) => {
                tracing::debug!(%anomaly, "degrading identity signal");
                anomaly.degrade()
            }
        }
    }

    pub fn session_present(&self) -> bool {
        self.session_present
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn status(&self) -> Option<TrainerStatus> {
        self.status
    }

    /// Collapses the signal into the state the policy table branches on.
    pub fn state(&self) -> AccessState {
        match (self.session_present, self.role, self.status) {
            (false, _, _) => AccessState::Anonymous,
            (true, Some(Role::Admin), _) => AccessState::Admin,
            (true, Some(Role::Trainer), Some(TrainerStatus::Active)) => AccessState::TrainerActive,
            (true, Some(Role::Trainer), Some(TrainerStatus::Suspended)) => {
                AccessState::TrainerSuspended
            }
            (true, Some(Role::Trainer), Some(TrainerStatus::Rejected)) => {
                AccessState::TrainerRejected
            }
            (true, Some(Role::Trainer), _) => AccessState::TrainerPending,
            // Students have no dashboard area of their own.
            (true, Some(Role::Student), _) | (true, None, _) => AccessState::Anonymous,
        }
    }
}

/// AccessState
///
/// Identity and trainer status collapsed into the rows of the access table.
/// Suspended and Rejected behave identically under the policy but stay distinct
/// so callers can show different messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AccessState {
    Anonymous,
    Admin,
    TrainerPending,
    TrainerActive,
    TrainerSuspended,
    TrainerRejected,
}

impl AccessState {
    pub const ALL: [AccessState; 6] = [
        AccessState::Anonymous,
        AccessState::Admin,
        AccessState::TrainerPending,
        AccessState::TrainerActive,
        AccessState::TrainerSuspended,
        AccessState::TrainerRejected,
    ];

    pub fn is_trainer(&self) -> bool {
        matches!(
            self,
            AccessState::TrainerPending
                | AccessState::TrainerActive
                | AccessState::TrainerSuspended
                | AccessState::TrainerRejected
        )
    }
}
