use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// AuthError
///
/// The two failure classes the session flow distinguishes. The split drives
/// policy everywhere else: a `Rejected` means the provider evaluated the
/// credential and said no (redirect to login, 401), while a `Provider`
/// failure means the answer is unknown (the server guard fails open, the
/// handlers answer 500).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity provider rejected the credential, code, or token.
    #[error("identity provider rejected the request")]
    Rejected,

    /// Transport failure or unexpected provider response. The session state
    /// could not be determined either way.
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Rejected => StatusCode::UNAUTHORIZED.into_response(),
            Self::Provider(_) => {
                tracing::error!(error = %self, "identity provider failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
