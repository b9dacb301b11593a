use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    identity::{AccessState, IdentitySignal},
    models::Profile,
    repository::ProfileStoreState,
    session::{SessionClaims, SessionKeys, read_session_cookie},
};

/// IdentityClaims
///
/// The payload of an identity provider token, presented once at sign-in.
/// Only the fields this service relies on are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Identity provider uid; also the key of the user's profile document.
    pub sub: String,
    #[serde(default)]
    pub email_verified: bool,
    pub exp: usize,
    pub iat: usize,
}

/// IdentityUser
///
/// A caller proven by the identity provider, joined with their profile.
/// Used only by the sign-in handler; everything else runs off the session cookie.
#[derive(Debug, Clone)]
pub struct IdentityUser {
    pub uid: String,
    pub email_verified: bool,
    pub profile: Profile,
}

/// IdentityUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing profile is accepted.
/// 2. Bearer token extraction and verification against the identity secret.
/// 3. Profile lookup: a valid token for a uid with no profile is still rejected.
///
/// Rejection: `401 Unauthorized` on any failure.
impl<S> FromRequestParts<S> for IdentityUser
where
    S: Send + Sync,
    ProfileStoreState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = ProfileStoreState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(uid) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|uid| !uid.is_empty())
            {
                if let Some(profile) = store.get_profile(uid).await {
                    tracing::debug!(uid, "local sign-in bypass");
                    return Ok(IdentityUser {
                        uid: profile.uid.clone(),
                        email_verified: true,
                        profile,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = verify_identity_token(token, &config.identity_secret)?;

        let profile = store.get_profile(&claims.sub).await.ok_or_else(|| {
            tracing::info!(uid = %claims.sub, "identity token for unknown profile");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(IdentityUser {
            uid: claims.sub,
            email_verified: claims.email_verified,
            profile,
        })
    }
}

/// verify_identity_token
///
/// Decodes and validates an identity provider token (HS256, expiry enforced).
pub fn verify_identity_token(token: &str, secret: &str) -> Result<IdentityClaims, StatusCode> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<IdentityClaims>(token, &key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("identity token expired"),
                _ => tracing::debug!(error = %e, "identity token rejected"),
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// SessionUser
///
/// A caller holding a valid session cookie. `signal` is already classified.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub claims: SessionClaims,
    pub signal: IdentitySignal,
}

impl SessionUser {
    pub fn uid(&self) -> &str {
        &self.claims.sub
    }

    pub fn state(&self) -> AccessState {
        self.signal.state()
    }

    /// Admin gate used by the review handlers.
    pub fn require_admin(&self) -> Result<(), StatusCode> {
        if self.state() == AccessState::Admin {
            Ok(())
        } else {
            Err(StatusCode::FORBIDDEN)
        }
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = read_session_cookie(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = keys.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "session cookie rejected");
            StatusCode::UNAUTHORIZED
        })?;

        let signal = claims.signal();
        Ok(SessionUser { claims, signal })
    }
}
