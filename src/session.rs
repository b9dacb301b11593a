use axum::http::{HeaderMap, HeaderValue, header, header::InvalidHeaderValue};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    identity::IdentitySignal,
};

/// Name of the cookie carrying the signed session attributes.
pub const SESSION_COOKIE: &str = "coach_session";

const CLEAR_COOKIE: &str = "coach_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
const CLEAR_COOKIE_SECURE: &str = "coach_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,
    #[error("session token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign session: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("anonymous signals cannot be issued a session")]
    Anonymous,
    #[error("session token is not a valid cookie value")]
    Cookie(#[source] InvalidHeaderValue),
}

/// SessionClaims
///
/// The signed session attributes. Role and status are stored as their canonical strings
/// and reclassified on every read, so a token minted by an older build (or tampered with
/// by someone holding the key) still goes through boundary validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity provider uid.
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Opaque auth marker, unique per issued session.
    pub sid: Uuid,
    #[serde(default)]
    pub email_verified: bool,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn signal(&self) -> IdentitySignal {
        IdentitySignal::classify(true, Some(&self.role), self.status.as_deref())
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp as i64, 0).unwrap_or_default()
    }
}

/// IssuedSession
///
/// A freshly signed session: the token to put in the cookie plus its claims.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// SessionKeys
///
/// Signs and verifies session attributes. Cloned into the shared application state;
/// there is no process-wide key material.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: u64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs as i64),
            secure,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.session_secret,
            config.session_ttl_secs,
            config.env == Env::Production,
        )
    }

    /// issue
    ///
    /// Signs a new session for `uid`. Only signals with a recognised role can be issued;
    /// the caller decides which roles are allowed to sign in at all.
    pub fn issue(
        &self,
        uid: &str,
        signal: &IdentitySignal,
        email_verified: bool,
    ) -> Result<IssuedSession, SessionError> {
        let role = signal.role().ok_or(SessionError::Anonymous)?;
        let now = Utc::now();

        let claims = SessionClaims {
            sub: uid.to_string(),
            role: role.as_str().to_string(),
            status: signal.status().map(|s| s.as_str().to_string()),
            sid: Uuid::new_v4(),
            email_verified,
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(SessionError::Signing)?;

        Ok(IssuedSession { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Sessions are short-lived; no clock skew allowance beyond the TTL itself.
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(e),
            })
    }

    /// signal_from_headers
    ///
    /// The edge evaluator's view of a request: the classified signal carried by the
    /// session cookie, or the anonymous signal if there is no cookie or it fails to verify.
    pub fn signal_from_headers(&self, headers: &HeaderMap) -> IdentitySignal {
        let Some(token) = read_session_cookie(headers) else {
            return IdentitySignal::anonymous();
        };

        match self.verify(&token) {
            Ok(claims) => claims.signal(),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unusable session cookie");
                IdentitySignal::anonymous()
            }
        }
    }

    pub fn set_cookie(&self, session: &IssuedSession) -> Result<HeaderValue, SessionError> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            session.token,
            self.ttl.num_seconds()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(SessionError::Cookie)
    }

    pub fn clear_cookie(&self) -> HeaderValue {
        if self.secure {
            HeaderValue::from_static(CLEAR_COOKIE_SECURE)
        } else {
            HeaderValue::from_static(CLEAR_COOKIE)
        }
    }
}

/// read_session_cookie
///
/// Finds the session cookie across every `Cookie` header of a request.
/// Empty values (a cleared cookie echoed back) count as absent.
pub fn read_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
