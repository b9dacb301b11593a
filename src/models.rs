use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::identity::{IdentitySignal, Role, TrainerStatus};

// --- Store Records ---

/// Profile
///
/// A user's record in the `profiles` collection, as the store hands it to us.
/// `role` and `status` are kept as raw text: the store is loosely typed and legacy
/// rows may carry values outside the known set. They are only ever interpreted
/// through [`Profile::signal`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    // Identity provider uid.
    pub uid: String,
    pub email: String,
    pub role: String,
    pub status: Option<String>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The classified signal for a signed-in holder of this profile.
    pub fn signal(&self) -> IdentitySignal {
        IdentitySignal::classify(true, Some(&self.role), self.status.as_deref())
    }
}

// --- Request Payloads ---

/// EvaluateRequest
///
/// Input for the client evaluation endpoint (POST /api/access/evaluate).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EvaluateRequest {
    #[schema(example = "/cms/programs")]
    pub path: String,
}

/// TrainerStatusUpdate
///
/// Input for the trainer review endpoint (PUT /api/admin/trainers/{uid}/status).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TrainerStatusUpdate {
    pub status: TrainerStatus,
}

/// Query parameters for GET /api/admin/trainers.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct TrainerFilter {
    /// Only list trainers in this review state.
    pub status: Option<TrainerStatus>,
}

// --- Responses ---

/// SessionView
///
/// What the dashboard client learns about the current session. `home` is the
/// landing path for this identity, so the client never has to derive it itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub uid: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub status: Option<TrainerStatus>,
    pub email_verified: bool,
    pub home: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// TrainerSummary
///
/// Row in the admin review list.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TrainerSummary {
    pub uid: String,
    pub email: String,
    pub status: TrainerStatus,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl TrainerSummary {
    /// None for profiles that are not trainers.
    pub fn from_profile(profile: &Profile) -> Option<Self> {
        let signal = profile.signal();
        match (signal.role(), signal.status()) {
            (Some(Role::Trainer), Some(status)) => Some(Self {
                uid: profile.uid.clone(),
                email: profile.email.clone(),
                status,
                updated_at: profile.updated_at,
            }),
            _ => None,
        }
    }
}
