mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use coach_portal::{
    AppState, create_router,
    config::Env,
    identity::{IdentitySignal, TrainerStatus},
    models::{SessionView, TrainerSummary},
    policy::AccessDecision,
    repository::ProfileStore,
};
use common::{cookie_pair, identity_token, seeded_store, session_cookie, test_state};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

// --- Test Utilities ---

fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn set_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string()
}

// --- Edge Guard ---

#[tokio::test]
async fn test_edge_guard_redirects_anonymous_from_admin() {
    let state = test_state(Env::Production, seeded_store());

    let response = app(&state).oneshot(get("/admin", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_edge_guard_redirects_pending_trainer_to_pending_page() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(
        &state,
        "trainer-pending",
        &IdentitySignal::trainer(TrainerStatus::Pending),
    );

    let response = app(&state)
        .oneshot(get("/cms/programs", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/pending-approval"));
}

#[tokio::test]
async fn test_edge_guard_lets_allowed_pages_through() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(&state, "admin-1", &IdentitySignal::admin());

    // No bundle configured: an allowed page reaches the fallback instead of redirecting.
    let response = app(&state)
        .oneshot(get("/cms/students", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(location(&response), None);
}

#[tokio::test]
async fn test_edge_guard_treats_forged_cookie_as_anonymous() {
    let state = test_state(Env::Production, seeded_store());

    let response = app(&state)
        .oneshot(get("/pending-approval", Some("coach_session=not.a.jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_health_is_public() {
    let state = test_state(Env::Production, seeded_store());
    let response = app(&state).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Client Evaluation Endpoint ---

#[tokio::test]
async fn test_evaluate_endpoint_matches_edge() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(
        &state,
        "trainer-active",
        &IdentitySignal::trainer(TrainerStatus::Active),
    );

    let response = app(&state)
        .oneshot(json_request(
            "POST",
            "/api/access/evaluate",
            Some(&cookie),
            serde_json::json!({ "path": "/login" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let decision: AccessDecision = read_json(response).await;
    assert_eq!(
        decision,
        AccessDecision {
            allow: false,
            redirect: Some("/".to_string())
        }
    );
}

#[tokio::test]
async fn test_evaluate_endpoint_anonymous() {
    let state = test_state(Env::Production, seeded_store());

    let response = app(&state)
        .oneshot(json_request(
            "POST",
            "/api/access/evaluate",
            None,
            serde_json::json!({ "path": "/register" }),
        ))
        .await
        .unwrap();

    let decision: AccessDecision = read_json(response).await;
    assert!(decision.allow);
}

#[tokio::test]
async fn test_evaluate_endpoint_decodes_paths_like_the_edge() {
    let state = test_state(Env::Production, seeded_store());

    for path in ["/%63ms/programs", "/%61dmin", "/login/../cms"] {
        let response = app(&state)
            .oneshot(json_request(
                "POST",
                "/api/access/evaluate",
                None,
                serde_json::json!({ "path": path }),
            ))
            .await
            .unwrap();

        let decision: AccessDecision = read_json(response).await;
        assert!(!decision.allow, "{path}");
        assert_eq!(decision.redirect.as_deref(), Some("/login"), "{path}");
    }
}

// --- Session Lifecycle ---

#[tokio::test]
async fn test_sign_in_issues_cookie_and_view() {
    let state = test_state(Env::Production, seeded_store());
    let token = identity_token("trainer-legacy", false, 3600);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("coach_session="));
    assert!(cookie.contains("Secure"));

    let view: SessionView = read_json(response).await;
    assert_eq!(view.uid, "trainer-legacy");
    // Legacy profile without a status is treated as pending.
    assert_eq!(view.status, Some(TrainerStatus::Pending));
    assert_eq!(view.home, "/pending-approval");
    assert!(!view.email_verified);
}

#[tokio::test]
async fn test_sign_in_refuses_students_and_unknown_roles() {
    let state = test_state(Env::Production, seeded_store());

    for uid in ["student-1", "weird-1"] {
        let token = identity_token(uid, true, 3600);
        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/session")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uid}");
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}

#[tokio::test]
async fn test_current_session_requires_cookie() {
    let state = test_state(Env::Production, seeded_store());

    let response = app(&state)
        .oneshot(get("/api/session/current", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = session_cookie(&state, "admin-1", &IdentitySignal::admin());
    let response = app(&state)
        .oneshot(get("/api/session/current", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: SessionView = read_json(response).await;
    assert_eq!(view.home, "/admin");
}

#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let state = test_state(Env::Production, seeded_store());

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).contains("Max-Age=0"));
}

#[tokio::test]
async fn test_approval_reaches_trainer_after_refresh() {
    let store = seeded_store();
    let state = test_state(Env::Production, store.clone());
    let trainer_cookie = session_cookie(
        &state,
        "trainer-pending",
        &IdentitySignal::trainer(TrainerStatus::Pending),
    );
    let admin_cookie = session_cookie(&state, "admin-1", &IdentitySignal::admin());

    // Admin approves the trainer.
    let response = app(&state)
        .oneshot(json_request(
            "PUT",
            "/api/admin/trainers/trainer-pending/status",
            Some(&admin_cookie),
            serde_json::json!({ "status": "active" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: TrainerSummary = read_json(response).await;
    assert_eq!(summary.status, TrainerStatus::Active);

    // The old cookie still says pending: eventual consistency until refresh.
    let response = app(&state)
        .oneshot(get("/cms", Some(&trainer_cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), Some("/pending-approval"));

    // "Check again" re-reads the profile and re-issues the cookie.
    let response = app(&state)
        .oneshot(json_request(
            "POST",
            "/api/session/refresh",
            Some(&trainer_cookie),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fresh_cookie = cookie_pair(&set_cookie(&response));
    let view: SessionView = read_json(response).await;
    assert_eq!(view.status, Some(TrainerStatus::Active));
    assert_eq!(view.home, "/");

    let response = app(&state)
        .oneshot(get("/cms", Some(&fresh_cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), None);

    let stored = store.get_profile("trainer-pending").await.unwrap();
    assert_eq!(stored.status.as_deref(), Some("active"));
}

#[tokio::test]
async fn test_refresh_for_removed_profile_clears_cookie() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(&state, "deleted-trainer", &IdentitySignal::trainer(TrainerStatus::Active));

    let response = app(&state)
        .oneshot(json_request(
            "POST",
            "/api/session/refresh",
            Some(&cookie),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response).contains("Max-Age=0"));
}

// --- Trainer Review ---

#[tokio::test]
async fn test_admin_lists_pending_trainers_including_legacy() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(&state, "admin-1", &IdentitySignal::admin());

    let response = app(&state)
        .oneshot(get("/api/admin/trainers?status=pending", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let trainers: Vec<TrainerSummary> = read_json(response).await;
    let mut uids: Vec<_> = trainers.iter().map(|t| t.uid.as_str()).collect();
    uids.sort();
    assert_eq!(uids, ["trainer-legacy", "trainer-pending"]);
}

#[tokio::test]
async fn test_trainer_review_requires_admin() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(
        &state,
        "trainer-active",
        &IdentitySignal::trainer(TrainerStatus::Active),
    );

    let response = app(&state)
        .oneshot(json_request(
            "PUT",
            "/api/admin/trainers/trainer-pending/status",
            Some(&cookie),
            serde_json::json!({ "status": "active" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&state)
        .oneshot(get("/api/admin/trainers", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_update_for_non_trainer_is_not_found() {
    let state = test_state(Env::Production, seeded_store());
    let cookie = session_cookie(&state, "admin-1", &IdentitySignal::admin());

    let response = app(&state)
        .oneshot(json_request(
            "PUT",
            "/api/admin/trainers/student-1/status",
            Some(&cookie),
            serde_json::json!({ "status": "active" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
