use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::{self, CurrentUser, TokenIssue},
    cookies,
    error::AuthError,
    models::Session,
};

// --- Route Classification Table ---

/// Redirect target for unauthenticated requests to the protected partition.
pub const LOGIN_PATH: &str = "/auth/login";
/// Redirect target for authenticated requests to the auth partition.
pub const DASHBOARD_PATH: &str = "/dashboard";
/// Carve-out inside the auth partition: reachable even with a session.
pub const CALLBACK_PATH: &str = "/auth/callback";
/// Post-exchange landing path.
pub const HOME_PATH: &str = "/";

/// RouteClass
///
/// Static partition of request paths. Every path belongs to exactly one
/// class; the callback path is carved out of the auth partition so a
/// just-authenticated browser completing the exchange is never bounced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Landing page, health probe, API docs. Never redirected.
    Public,
    /// Auth pages (login, logout). Redirected to the dashboard when a
    /// session is already present.
    Auth,
    /// The code-exchange callback. Always passes through.
    AuthCallback,
    /// Everything else. Requires a session.
    Protected,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if path == CALLBACK_PATH || path.starts_with("/auth/callback/") {
            return Self::AuthCallback;
        }
        if path == "/auth" || path.starts_with("/auth/") {
            return Self::Auth;
        }
        if path == HOME_PATH
            || path == "/health"
            || path.starts_with("/swagger-ui")
            || path.starts_with("/api-docs")
        {
            return Self::Public;
        }
        Self::Protected
    }
}

/// GuardDecision
///
/// The three possible outcomes of the server-side route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    PassThrough,
    ToLogin,
    ToDashboard,
}

/// decide
///
/// The pure decision core of the guard:
/// 1. no valid session and the path is protected: redirect to login;
/// 2. valid session and the path is an auth page (not the callback):
///    redirect to the dashboard;
/// 3. otherwise pass through unchanged.
pub fn decide(class: RouteClass, authenticated: bool) -> GuardDecision {
    match (class, authenticated) {
        (RouteClass::Protected, false) => GuardDecision::ToLogin,
        (RouteClass::Auth, true) => GuardDecision::ToDashboard,
        _ => GuardDecision::PassThrough,
    }
}

// --- Session Resolution ---

/// A session resolved from request cookies. `refreshed` carries the
/// replacement session when the guard had to go through the provider, so the
/// response can hand the new cookies to the browser.
struct ResolvedSession {
    identity: CurrentUser,
    refreshed: Option<Session>,
}

/// resolve_session
///
/// Step 1 of the guard algorithm: attempt to read or refresh a session from
/// the request's credential cookies.
///
/// - A fresh access token validates locally, no provider call.
/// - An expired or malformed access token falls back to the refresh cookie
///   and a provider refresh; success means a transparently renewed session.
/// - A cleanly rejected refresh token is `Ok(None)`: there is no session.
/// - A provider transport failure is `Err`: the caller fails open.
async fn resolve_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<ResolvedSession>, AuthError> {
    if let Some(token) = cookies::access_token(jar) {
        match auth::decode_access_token(&token, &state.config.jwt_secret) {
            Ok(identity) => {
                return Ok(Some(ResolvedSession {
                    identity,
                    refreshed: None,
                }));
            }
            // Both cases fall through to the refresh path below. An expired
            // token is the normal renewal case; a malformed cookie is simply
            // not a session, but the refresh cookie may still be good.
            Err(TokenIssue::Expired) | Err(TokenIssue::Invalid) => {}
        }
    }

    let Some(refresh) = cookies::refresh_token(jar) else {
        return Ok(None);
    };

    match state.provider.refresh_session(&refresh).await {
        Ok(session) => {
            let identity = auth::decode_access_token(&session.access_token, &state.config.jwt_secret)
                .unwrap_or_else(|_| identity_from_session(&session));
            Ok(Some(ResolvedSession {
                identity,
                refreshed: Some(session),
            }))
        }
        Err(AuthError::Rejected) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fallback identity for a provider-issued session whose token is not
/// decodable with the local secret (e.g. a mock session in tests).
fn identity_from_session(session: &Session) -> CurrentUser {
    CurrentUser {
        id: session.subject_id,
        email: None,
        role: "authenticated".to_string(),
        expires_at: session.expires_at,
        access_token: session.access_token.clone(),
    }
}

// --- The Middleware ---

/// session_guard
///
/// Runs before every routed request. Classifies the path, resolves the
/// session from cookies (refreshing through the provider when needed), and
/// applies the decision table: pass through, redirect to login, or redirect
/// to the dashboard.
///
/// Failure semantics: an error while resolving the session is logged and the
/// request passes through unmodified. This errs toward availability over
/// strict enforcement; protected handlers still reject with 401 through the
/// `CurrentUser` extractor, so a provider outage degrades rather than locks
/// the door open.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let class = RouteClass::classify(request.uri().path());

    let resolved = match resolve_session(&state, &jar).await {
        Ok(resolved) => resolved,
        Err(e) => {
            // Fail-open: availability wins over enforcement here.
            tracing::warn!(error = %e, path = %request.uri().path(),
                "session resolution failed, passing request through");
            return next.run(request).await;
        }
    };

    let mut decision = decide(class, resolved.is_some());
    if decision == GuardDecision::ToDashboard
        && !matches!(*request.method(), Method::GET | Method::HEAD)
    {
        // The dashboard bounce applies to page navigations. Action endpoints
        // under /auth (sign-in, sign-out posts) must still reach their
        // handlers even when a session is present.
        decision = GuardDecision::PassThrough;
    }

    match decision {
        GuardDecision::ToLogin => Redirect::to(LOGIN_PATH).into_response(),
        GuardDecision::ToDashboard => Redirect::to(DASHBOARD_PATH).into_response(),
        GuardDecision::PassThrough => {
            let refreshed = match resolved {
                Some(session) => {
                    // Hand the resolved identity to downstream extractors;
                    // the request cookie may hold a token that just expired.
                    request.extensions_mut().insert(session.identity);
                    session.refreshed
                }
                None => None,
            };

            let mut response = next.run(request).await;

            if let Some(session) = refreshed {
                tracing::debug!(subject = %session.subject_id, "session refreshed by guard");
                cookies::append_session_cookies(
                    response.headers_mut(),
                    &session,
                    state.config.secure_cookies,
                );
            }

            response
        }
    }
}
