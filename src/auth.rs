use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, cookies};

/// Claims
///
/// The payload structure expected inside an access-token JWT issued by the
/// identity provider. The token is signed with the project secret and
/// validated locally on every authenticated request; no provider round trip
/// is needed to check it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user at the identity provider.
    pub sub: Uuid,
    /// Expiration time (exp): timestamp after which the JWT must not be
    /// accepted.
    pub exp: usize,
    /// Issued at (iat): timestamp when the JWT was issued.
    pub iat: usize,
    /// Email claim, present on provider-issued tokens.
    pub email: Option<String>,
    /// Provider role claim ("authenticated" for ordinary sessions).
    pub role: Option<String>,
}

/// TokenIssue
///
/// Why a presented access token was not accepted. The server guard treats
/// the two cases differently: an expired token is eligible for a transparent
/// refresh, a malformed one is simply not a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenIssue {
    Expired,
    Invalid,
}

/// CurrentUser
///
/// The resolved identity of an authenticated request. Produced either by the
/// server guard (placed into request extensions after a successful resolve)
/// or directly by the extractor from the access-token cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
    /// Expiry of the backing access token.
    pub expires_at: DateTime<Utc>,
    /// The raw token, kept for provider calls made on the user's behalf.
    pub access_token: String,
}

/// decode_access_token
///
/// Validates an access-token JWT (signature and expiry) against the project
/// secret and projects its claims into a `CurrentUser`.
pub fn decode_access_token(token: &str, secret: &str) -> Result<CurrentUser, TokenIssue> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenIssue::Expired,
            // Bad signature, malformed token, wrong algorithm and friends.
            _ => TokenIssue::Invalid,
        }
    })?;

    let claims = token_data.claims;

    Ok(CurrentUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role.unwrap_or_else(|| "authenticated".to_string()),
        expires_at: DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .unwrap_or_else(Utc::now),
        access_token: token.to_string(),
    })
}

/// CurrentUser Extractor Implementation
///
/// Makes `CurrentUser` usable as a function argument in any protected
/// handler. Resolution order:
/// 1. The identity the server guard injected into request extensions. This
///    covers the case where the guard just refreshed an expired token; the
///    cookie on the request is stale but the session is valid.
/// 2. The access-token cookie, validated locally.
///
/// Rejection: 401 Unauthorized on any failure. Together with the guard this
/// gives the protected partition two independent checks.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let config = AppConfig::from_ref(state);

        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let token = cookies::access_token(&jar).ok_or(StatusCode::UNAUTHORIZED)?;

        decode_access_token(&token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)
    }
}
