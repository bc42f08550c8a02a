use tokio::sync::Mutex;

use crate::models::{AuthState, Session};
use crate::provider::ProviderState;

/// AuthStore
///
/// The client-side session store: a single `AuthState` behind a lock,
/// constructed by the embedding application and passed explicitly to
/// whatever needs it. Deliberately not a process singleton.
///
/// Writers are the session initializer and the explicit sign-in/sign-out
/// completions below; nothing else mutates the state.
pub struct AuthStore {
    state: Mutex<AuthState>,
}

impl AuthStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuthState::default()),
        }
    }

    /// A point-in-time copy of the authentication state, for the gate state
    /// machine and for rendering.
    pub async fn snapshot(&self) -> AuthState {
        self.state.lock().await.clone()
    }

    /// initialize
    ///
    /// The session initializer. Asks the identity provider for an existing
    /// session using whatever refresh token the embedder persisted from a
    /// previous visit, and populates the store exactly once.
    ///
    /// Idempotent and coalescing: a call that arrives after the first
    /// attempt, or while the first attempt is still in flight, is a no-op.
    /// Only the first call ever reaches the provider.
    ///
    /// The terminating step sets `initialization_attempted = true` on every
    /// path, including provider failure, so gates watching the store never
    /// block forever. No retries; a failed attempt records `error` and
    /// leaves the store unauthenticated.
    pub async fn initialize(&self, provider: &ProviderState, persisted_refresh_token: Option<&str>) {
        {
            let mut state = self.state.lock().await;
            if state.initialization_attempted || state.is_loading {
                return;
            }
            state.is_loading = true;
        }

        let outcome = match persisted_refresh_token {
            Some(token) => provider.get_session(token).await,
            // Nothing persisted: the answer is known without a provider call.
            None => Ok(None),
        };

        let mut state = self.state.lock().await;
        match outcome {
            Ok(Some(session)) => {
                state.is_authenticated = true;
                state.session = Some(session);
                state.error = None;
            }
            Ok(None) => {
                state.is_authenticated = false;
                state.session = None;
                state.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "session initialization failed");
                state.is_authenticated = false;
                state.session = None;
                state.error = Some(e.to_string());
            }
        }
        // Terminating step, reached on success and failure alike.
        state.is_loading = false;
        state.initialization_attempted = true;
    }

    /// Record a session obtained through an explicit sign-in or a completed
    /// code exchange.
    pub async fn complete_sign_in(&self, session: Session) {
        let mut state = self.state.lock().await;
        state.is_authenticated = true;
        state.session = Some(session);
        state.error = None;
    }

    /// Drop the held session after sign-out.
    pub async fn complete_sign_out(&self) {
        let mut state = self.state.lock().await;
        state.is_authenticated = false;
        state.session = None;
        state.error = None;
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}
