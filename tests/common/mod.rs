#![allow(dead_code)]

use chrono::Utc;
use coach_portal::{
    AccessPolicy, AppState, InMemoryProfileStore,
    auth::IdentityClaims,
    config::{AppConfig, Env},
    identity::IdentitySignal,
    models::Profile,
    repository::ProfileStoreState,
    session::SESSION_COOKIE,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;

pub const TEST_IDENTITY_SECRET: &str = "test-identity-secret-value";
pub const TEST_SESSION_SECRET: &str = "test-session-secret-value";

pub fn profile(uid: &str, role: &str, status: Option<&str>) -> Profile {
    Profile {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        role: role.to_string(),
        status: status.map(str::to_string),
        updated_at: Utc::now(),
    }
}

/// One profile per interesting identity shape, including legacy and garbage rows.
pub fn seeded_store() -> Arc<InMemoryProfileStore> {
    Arc::new(InMemoryProfileStore::with_profiles([
        profile("admin-1", "admin", None),
        profile("trainer-active", "trainer", Some("active")),
        profile("trainer-pending", "trainer", Some("pending")),
        profile("trainer-suspended", "trainer", Some("suspended")),
        profile("trainer-legacy", "trainer", None),
        profile("student-1", "student", None),
        profile("weird-1", "coach", Some("active")),
    ]))
}

pub fn test_config(env: Env) -> AppConfig {
    AppConfig {
        env,
        identity_secret: TEST_IDENTITY_SECRET.to_string(),
        session_secret: TEST_SESSION_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(env: Env, store: Arc<InMemoryProfileStore>) -> AppState {
    AppState::new(
        test_config(env),
        store as ProfileStoreState,
        AccessPolicy::default(),
    )
}

pub fn identity_token(uid: &str, email_verified: bool, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = IdentityClaims {
        sub: uid.to_string(),
        email_verified,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };
    let key = EncodingKey::from_secret(TEST_IDENTITY_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

/// A `Cookie` header value holding a session issued by `state`'s keys.
pub fn session_cookie(state: &AppState, uid: &str, signal: &IdentitySignal) -> String {
    let issued = state.sessions.issue(uid, signal, true).unwrap();
    format!("{SESSION_COOKIE}={}", issued.token)
}

/// Pulls the session cookie pair out of a `Set-Cookie` value, ready to send back.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}
