use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Trainer review. Nested under `/api/admin`; each handler checks that the session
/// belongs to an admin and answers 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/trainers?status=pending
        .route("/trainers", get(handlers::list_trainers))
        // PUT /api/admin/trainers/{uid}/status
        // Approve, suspend or reject a trainer.
        .route("/trainers/{uid}/status", put(handlers::update_trainer_status))
}
