use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health checks, sign-in/sign-out and
/// the client evaluation point (which evaluates anonymous callers too).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe.
        .route("/health", get(|| async { "ok" }))
        // POST /api/session   identity token in, session cookie out
        // DELETE /api/session clears the cookie
        .route(
            "/api/session",
            post(handlers::sign_in).delete(handlers::sign_out),
        )
        // POST /api/access/evaluate
        .route("/api/access/evaluate", post(handlers::evaluate_access))
}
