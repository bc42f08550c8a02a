use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Session Schemas ---

/// Session
///
/// The application's read-only, time-bounded copy of a session issued by the
/// external identity provider. Created on a successful sign-in or code
/// exchange, refreshed transparently by the server guard before expiry, and
/// destroyed on sign-out or expiry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Session {
    /// Subject of the session, mapped to the provider's `auth.users.id`.
    pub subject_id: Uuid,

    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
    /// Instant after which the access token must no longer be accepted.
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,

    /// Short-lived JWT presented on every authenticated request.
    pub access_token: String,
    /// Opaque token used to obtain a replacement session from the provider.
    pub refresh_token: String,
}

impl Session {
    /// Whether the access token is still inside its validity window.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// AuthState
///
/// Client-side projection of authentication state, owned by the `AuthStore`
/// and consumed by the gate state machine and the dashboard frontend.
///
/// Invariant: `is_authenticated` is only trustworthy once
/// `initialization_attempted` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthState {
    pub is_loading: bool,
    pub is_authenticated: bool,
    /// Set exactly once by the session initializer, on success and failure
    /// alike, so dependent gates never block forever.
    pub initialization_attempted: bool,
    pub error: Option<String>,
    pub session: Option<Session>,
}

/// UserProfile
///
/// The authenticated user's profile as reported by the identity provider
/// (GET /me). Richer than the claims embedded in the access token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// --- Request Payloads (Input Schemas) ---

/// SignInRequest
///
/// Input payload for the password sign-in endpoint (POST /auth/login).
/// The password is passed through to the external identity provider and
/// never persisted or logged by this application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// CallbackParams
///
/// Query parameters delivered by the identity provider's redirect back to
/// /auth/callback. Every field is optional; the handler treats anything
/// short of a usable `code` as a failed exchange.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// --- Dashboard Schemas (Output) ---

/// DashboardView
///
/// Output schema for the protected dashboard summary (GET /dashboard).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardView {
    pub subject_id: Uuid,
    pub email: Option<String>,
    #[ts(type = "string")]
    pub session_expires_at: DateTime<Utc>,
}
