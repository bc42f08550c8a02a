use crate::error::AuthError;
use crate::models::{Session, UserProfile};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// IdentityProvider Contract
///
/// Defines the abstract contract for all interactions with the external
/// identity provider. The trait lets the handlers and the server guard run
/// against the real hosted service (HttpIdentityProvider) in production and
/// the in-memory Mock (MockIdentityProvider) in tests, without change.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn IdentityProvider>`) safely shareable across Axum's asynchronous
/// task boundaries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in. Returns a freshly issued session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Tolerant session lookup for the session initializer. A credential the
    /// provider no longer honors yields `Ok(None)`, not an error.
    async fn get_session(&self, refresh_token: &str) -> Result<Option<Session>, AuthError>;

    /// Resolves the profile behind an access token. `Ok(None)` means the
    /// token is no longer accepted.
    async fn get_user(&self, access_token: &str) -> Result<Option<UserProfile>, AuthError>;

    /// Exchanges a one-time authorization code for a session.
    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError>;

    /// Strict refresh. A rejected refresh token is `Err(AuthError::Rejected)`.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Revokes the session behind the access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// ProviderState
///
/// The concrete type used to share identity-provider access across the
/// application state.
pub type ProviderState = Arc<dyn IdentityProvider>;

// --- Provider Wire Schemas ---

/// Token grant response from the provider's /auth/v1/token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: ProviderUser,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
    email: Option<String>,
    role: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let issued_at = Utc::now();
        Session {
            subject_id: self.user.id,
            issued_at,
            expires_at: issued_at + Duration::seconds(self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

// --- The Real Implementation (Hosted GoTrue REST API) ---

/// HttpIdentityProvider
///
/// The concrete implementation speaking the hosted provider's REST auth API.
/// All session issuance goes through the `/auth/v1/token` endpoint with a
/// grant-type discriminator; profile lookup and revocation ride the bearer
/// token. Every request carries the project's public `apikey` header.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    /// Constructs the provider client from the loaded AppConfig values.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Issues a token-grant request and maps the response onto a Session.
    ///
    /// Status mapping: 2xx parses into a session, 4xx is a clean rejection,
    /// anything else (including transport failures) is a provider error.
    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::Rejected);
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!("token grant returned {status}")));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(token.into_session())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// get_session
    ///
    /// The hosted API has no server-side "current session" lookup, so this is
    /// implemented through the refresh grant, the same way the provider's own
    /// server-rendering clients restore a session on boot. A rejection maps
    /// to `Ok(None)`.
    async fn get_session(&self, refresh_token: &str) -> Result<Option<Session>, AuthError> {
        match self.refresh_session(refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(AuthError::Rejected) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<UserProfile>, AuthError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!("user lookup returned {status}")));
        }

        let user = response
            .json::<ProviderUser>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(Some(UserProfile {
            id: user.id,
            email: user.email.unwrap_or_default(),
            role: user.role.unwrap_or_else(|| "authenticated".to_string()),
        }))
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<Session, AuthError> {
        self.token_grant("pkce", serde_json::json!({ "auth_code": code }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            // Already-revoked sessions are a no-op from the caller's view.
            return Ok(());
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!("logout returned {status}")));
        }
        Ok(())
    }
}

// --- The Mock Implementation (For Tests) ---

/// MockIdentityProvider
///
/// An in-memory implementation of `IdentityProvider` used by unit and
/// integration tests. It answers every operation from a single configured
/// session/profile pair, can simulate a provider outage via `should_fail`,
/// and counts `get_session` calls so tests can assert that the session
/// initializer consults the provider exactly once.
pub struct MockIdentityProvider {
    session: Option<Session>,
    user: Option<UserProfile>,
    /// When true, all operations return a simulated transport failure.
    pub should_fail: bool,
    get_session_calls: AtomicUsize,
}

impl MockIdentityProvider {
    /// A provider with no session to hand out: every credential is rejected.
    pub fn new() -> Self {
        Self {
            session: None,
            user: None,
            should_fail: false,
            get_session_calls: AtomicUsize::new(0),
        }
    }

    /// A provider that honors any credential with the given session.
    pub fn with_session(session: Session) -> Self {
        let user = UserProfile {
            id: session.subject_id,
            email: "agent@example.com".to_string(),
            role: "authenticated".to_string(),
        };
        Self {
            session: Some(session),
            user: Some(user),
            should_fail: false,
            get_session_calls: AtomicUsize::new(0),
        }
    }

    /// A provider that is unreachable: every operation fails.
    pub fn new_failing() -> Self {
        Self {
            session: None,
            user: None,
            should_fail: true,
            get_session_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `get_session` calls observed so far.
    pub fn get_session_calls(&self) -> usize {
        self.get_session_calls.load(Ordering::SeqCst)
    }

    fn outage(&self) -> Result<(), AuthError> {
        if self.should_fail {
            return Err(AuthError::Provider(
                "mock provider: simulated outage".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, AuthError> {
        self.outage()?;
        self.session.clone().ok_or(AuthError::Rejected)
    }

    async fn get_session(&self, _refresh_token: &str) -> Result<Option<Session>, AuthError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;
        Ok(self.session.clone())
    }

    async fn get_user(&self, _access_token: &str) -> Result<Option<UserProfile>, AuthError> {
        self.outage()?;
        Ok(self.user.clone())
    }

    async fn exchange_code_for_session(&self, _code: &str) -> Result<Session, AuthError> {
        self.outage()?;
        self.session.clone().ok_or(AuthError::Rejected)
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        self.outage()?;
        self.session.clone().ok_or(AuthError::Rejected)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.outage()?;
        Ok(())
    }
}
