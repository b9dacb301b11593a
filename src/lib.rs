use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access policy core.
pub mod identity;
pub mod policy;
pub mod propagation;
pub mod route_class;

// Collaborators and the HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;

pub mod routes;
use auth::SessionUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use policy::{AccessDecision, AccessPolicy};
pub use repository::{InMemoryProfileStore, PostgresProfileStore, ProfileStoreState};
pub use session::SessionKeys;

/// ApiDoc
///
/// OpenAPI document for the session, evaluation and trainer review endpoints,
/// served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_in, handlers::current_session, handlers::refresh_session,
        handlers::sign_out, handlers::evaluate_access, handlers::list_trainers,
        handlers::update_trainer_status
    ),
    components(
        schemas(
            models::SessionView, models::EvaluateRequest, models::TrainerStatusUpdate,
            models::TrainerSummary, policy::AccessDecision, identity::Role,
            identity::TrainerStatus,
        )
    ),
    tags(
        (name = "coach-portal", description = "Trainer dashboard access and session API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for every service a request may need. Everything the
/// evaluators use is passed in explicitly from here; there are no process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    /// Profile store (the document database collaborator).
    pub store: ProfileStoreState,
    /// Signing keys for the session attribute cookie.
    pub sessions: SessionKeys,
    /// Route table plus access table, shared by the edge guard and the client endpoint.
    pub policy: Arc<AccessPolicy>,
    pub config: AppConfig,
}

impl AppState {
    /// Assembles the state from a loaded configuration and an already-built store.
    pub fn new(config: AppConfig, store: ProfileStoreState, policy: AccessPolicy) -> Self {
        Self {
            store,
            sessions: SessionKeys::from_config(&config),
            policy: Arc::new(policy),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ProfileStoreState {
    fn from_ref(app_state: &AppState) -> ProfileStoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(app_state: &AppState) -> SessionKeys {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<AccessPolicy> {
    fn from_ref(app_state: &AppState) -> Arc<AccessPolicy> {
        app_state.policy.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_middleware
///
/// Rejects requests to the authenticated routes with 401 unless `SessionUser` extracts.
async fn session_middleware(_session: SessionUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// edge_guard
///
/// The edge evaluation point. Runs before any handler or page content: the session
/// cookie is classified (anonymous when absent or unverifiable), the path is classified,
/// and a denied request is answered with a temporary redirect to the policy's target.
async fn edge_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let signal = state.sessions.signal_from_headers(request.headers());
    let decision = state.policy.decide_path(signal.state(), request.uri().path());

    match decision {
        policy::Decision::Allow => next.run(request).await,
        policy::Decision::Deny(target) => {
            tracing::info!(
                path = %request.uri().path(),
                state = ?signal.state(),
                redirect = target.path(),
                "edge guard redirect"
            );
            Redirect::temporary(target.path()).into_response()
        }
    }
}

/// create_router
///
/// Assembles the routing structure, the edge guard, and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            )),
        )
        .nest("/api/admin", admin::admin_routes());

    // Page paths fall through to the dashboard bundle (SPA fallback to index.html).
    let with_pages = match &state.config.frontend_dir {
        Some(dir) => api_router
            .fallback_service(ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))),
        None => api_router.fallback(handlers::page_not_bundled),
    };

    let base_router = with_pages
        // The guard wraps the fallback too, so pages are never served before evaluation.
        .layer(middleware::from_fn_with_state(state.clone(), edge_guard))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
