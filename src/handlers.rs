use crate::{
    AppState,
    auth::{IdentityUser, SessionUser},
    identity::{IdentitySignal, Role},
    models::{
        EvaluateRequest, SessionView, TrainerFilter, TrainerStatusUpdate, TrainerSummary,
    },
    policy::{AccessDecision, home_for},
    session::SessionClaims,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

// --- Helpers ---

/// Builds the client's view of a session. `None` for signals without a dashboard role.
fn session_view(claims: &SessionClaims, signal: &IdentitySignal) -> Option<SessionView> {
    let role = signal.role()?;
    Some(SessionView {
        uid: claims.sub.clone(),
        role,
        status: signal.status(),
        email_verified: claims.email_verified,
        home: home_for(signal.state()).path().to_string(),
        expires_at: claims.expires_at(),
    })
}

// Only trainers and admins hold dashboard sessions.
fn may_sign_in(signal: &IdentitySignal) -> bool {
    matches!(signal.role(), Some(Role::Trainer) | Some(Role::Admin))
}

fn issue_response(
    state: &AppState,
    uid: &str,
    signal: &IdentitySignal,
    email_verified: bool,
) -> Result<Response, StatusCode> {
    let issued = state
        .sessions
        .issue(uid, signal, email_verified)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to issue session");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let view = session_view(&issued.claims, signal).ok_or(StatusCode::FORBIDDEN)?;
    let cookie = state.sessions.set_cookie(&issued).map_err(|e| {
        tracing::error!(error = %e, "failed to build session cookie");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(view)).into_response())
}

// --- Session Handlers ---

/// sign_in
///
/// [Public Route] Exchanges an identity provider token for session attributes.
///
/// The profile's role and status are read once here and carried in the signed cookie,
/// so the edge guard never touches the store. Students and profiles with an
/// unrecognised role are refused.
#[utoipa::path(
    post,
    path = "/api/session",
    responses(
        (status = 200, description = "Session issued", body = SessionView),
        (status = 401, description = "Invalid identity token or unknown profile"),
        (status = 403, description = "Role may not use the dashboard")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    identity: IdentityUser,
) -> Result<Response, StatusCode> {
    let signal = identity.profile.signal();
    if !may_sign_in(&signal) {
        tracing::info!(uid = %identity.uid, "sign-in refused for non-dashboard role");
        return Err(StatusCode::FORBIDDEN);
    }

    tracing::info!(uid = %identity.uid, state = ?signal.state(), "session issued");
    issue_response(&state, &identity.uid, &signal, identity.email_verified)
}

/// current_session
///
/// [Authenticated Route] Returns what the session cookie currently says.
#[utoipa::path(
    get,
    path = "/api/session/current",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 401, description = "No valid session")
    )
)]
pub async fn current_session(user: SessionUser) -> Result<Json<SessionView>, StatusCode> {
    session_view(&user.claims, &user.signal)
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// refresh_session
///
/// [Authenticated Route] Re-reads the profile and re-issues the session attributes.
///
/// This is how out-of-band status changes (an admin approving a trainer) reach the
/// edge guard before the current cookie expires: the pending-approval page calls it
/// from its "check again" action. A profile that disappeared or lost its dashboard
/// role gets its cookie cleared.
#[utoipa::path(
    post,
    path = "/api/session/refresh",
    responses(
        (status = 200, description = "Session re-issued", body = SessionView),
        (status = 401, description = "No valid session or profile removed"),
        (status = 403, description = "Role may no longer use the dashboard")
    )
)]
pub async fn refresh_session(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, Response> {
    let clear = [(header::SET_COOKIE, state.sessions.clear_cookie())];

    let Some(profile) = state.store.get_profile(user.uid()).await else {
        tracing::info!(uid = user.uid(), "refresh for missing profile");
        return Err((StatusCode::UNAUTHORIZED, clear).into_response());
    };

    let signal = profile.signal();
    if !may_sign_in(&signal) {
        return Err((StatusCode::FORBIDDEN, clear).into_response());
    }

    if signal != user.signal {
        tracing::info!(
            uid = user.uid(),
            from = ?user.signal.state(),
            to = ?signal.state(),
            "session attributes changed on refresh"
        );
    }

    issue_response(&state, user.uid(), &signal, user.claims.email_verified)
        .map_err(IntoResponse::into_response)
}

/// sign_out
///
/// [Public Route] Clears the session cookie. Idempotent; needs no valid session.
#[utoipa::path(
    delete,
    path = "/api/session",
    responses((status = 204, description = "Session cleared"))
)]
pub async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
    )
}

// --- Access Evaluation ---

/// evaluate_access
///
/// [Public Route] The client evaluation point. Runs the same policy as the edge guard
/// against the caller's session cookie (anonymous if absent or invalid).
#[utoipa::path(
    post,
    path = "/api/access/evaluate",
    request_body = EvaluateRequest,
    responses((status = 200, description = "Verdict", body = AccessDecision))
)]
pub async fn evaluate_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EvaluateRequest>,
) -> Json<AccessDecision> {
    let signal = state.sessions.signal_from_headers(&headers);
    Json(state.policy.evaluate(&signal, &payload.path))
}

// --- Trainer Review (Admin) ---

/// list_trainers
///
/// [Admin Route] Lists trainer accounts, optionally filtered by review status.
#[utoipa::path(
    get,
    path = "/api/admin/trainers",
    params(TrainerFilter),
    responses(
        (status = 200, description = "Trainers", body = [TrainerSummary]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_trainers(
    user: SessionUser,
    State(state): State<AppState>,
    Query(filter): Query<TrainerFilter>,
) -> Result<Json<Vec<TrainerSummary>>, StatusCode> {
    user.require_admin()?;

    let trainers = state
        .store
        .list_trainers(filter.status)
        .await
        .iter()
        .filter_map(TrainerSummary::from_profile)
        .collect();

    Ok(Json(trainers))
}

/// update_trainer_status
///
/// [Admin Route] Approves, suspends or rejects a trainer.
///
/// Only the store changes here. The trainer observes the new status on their next
/// session refresh or sign-in.
#[utoipa::path(
    put,
    path = "/api/admin/trainers/{uid}/status",
    params(("uid" = String, Path, description = "Trainer uid")),
    request_body = TrainerStatusUpdate,
    responses(
        (status = 200, description = "Updated", body = TrainerSummary),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such trainer")
    )
)]
pub async fn update_trainer_status(
    user: SessionUser,
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(update): Json<TrainerStatusUpdate>,
) -> Result<Json<TrainerSummary>, StatusCode> {
    user.require_admin()?;

    let profile = state
        .store
        .set_trainer_status(&uid, update.status)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    tracing::info!(
        admin = user.uid(),
        trainer = %uid,
        status = update.status.as_str(),
        "trainer status changed"
    );

    TrainerSummary::from_profile(&profile)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// page_not_bundled
///
/// Fallback when no dashboard bundle is configured. Reached only after the edge guard allowed the path.
pub async fn page_not_bundled() -> StatusCode {
    StatusCode::NOT_FOUND
}
