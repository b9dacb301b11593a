use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a verified `SessionUser`. The router is wrapped in the
/// session middleware as well, so a missing or expired cookie is rejected before any
/// handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/session/current
        // What the cookie currently says (role, status, landing path).
        .route("/api/session/current", get(handlers::current_session))
        // POST /api/session/refresh
        // Re-reads the profile so status changes made by an admin take effect.
        .route("/api/session/refresh", post(handlers::refresh_session))
}
