use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    AppState,
    auth::CurrentUser,
    cookies,
    error::AuthError,
    guard::{DASHBOARD_PATH, HOME_PATH, LOGIN_PATH},
    models::{CallbackParams, DashboardView, SignInRequest, UserProfile},
};

// --- Query Structs ---

/// LoginPageQuery
///
/// Query parameters for the login page. `error` carries the short code a
/// failed sign-in or callback redirected back with.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

// --- Public Handlers ---

/// home
///
/// [Public Route] Landing document for the portal root.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing document"))
)]
pub async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "agency-portal",
        "status": "ok",
    }))
}

/// login_page
///
/// [Public Route] The login page document consumed by the dashboard
/// frontend. Carries the error code from a failed sign-in attempt, if any.
/// An authenticated browser never sees this handler; the server guard
/// redirects it to the dashboard first.
#[utoipa::path(
    get,
    path = "/auth/login",
    params(LoginPageQuery),
    responses((status = 200, description = "Login page document"))
)]
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "page": "login",
        "error": query.error,
    }))
}

/// sign_in
///
/// [Public Route] Password sign-in against the external identity provider.
///
/// On success the session cookie pair is set and the browser is redirected
/// to the dashboard. Failures never surface as errors to the browser: a
/// rejection or provider failure is logged and redirected back to the login
/// page with a short error code.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = SignInRequest,
    responses((status = 303, description = "Redirect: dashboard on success, login with an error code otherwise"))
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Redirect), Redirect> {
    match state.provider.sign_in(&payload.email, &payload.password).await {
        Ok(session) => {
            tracing::info!(subject = %session.subject_id, "password sign-in succeeded");
            let (access, refresh) = cookies::session_cookies(&session, state.config.secure_cookies);
            Ok((jar.add(access).add(refresh), Redirect::to(DASHBOARD_PATH)))
        }
        Err(AuthError::Rejected) => {
            tracing::warn!(email = %payload.email, "password sign-in rejected");
            Err(Redirect::to("/auth/login?error=invalid_credentials"))
        }
        Err(e) => {
            tracing::error!(error = %e, "password sign-in failed");
            Err(Redirect::to("/auth/login?error=provider_unavailable"))
        }
    }
}

/// auth_callback
///
/// [Public Route] Completes the external identity redirect by exchanging the
/// one-time authorization code for a session.
///
/// On success: session cookies are set and the browser is redirected home.
/// On any failure (provider-reported error, missing code, rejected exchange,
/// transport failure) the browser is redirected to login; raw errors are
/// logged, never surfaced.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackParams),
    responses((status = 303, description = "Redirect: home on success, login on any failure"))
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), Redirect> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("unknown");
        tracing::warn!(error = %error, description = %desc, "provider reported an error on callback");
        return Err(Redirect::to(LOGIN_PATH));
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!("callback reached without an authorization code");
        return Err(Redirect::to(LOGIN_PATH));
    };

    match state.provider.exchange_code_for_session(code).await {
        Ok(session) => {
            tracing::info!(subject = %session.subject_id, "code exchange succeeded");
            let (access, refresh) = cookies::session_cookies(&session, state.config.secure_cookies);
            Ok((jar.add(access).add(refresh), Redirect::to(HOME_PATH)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "code exchange failed");
            Err(Redirect::to(LOGIN_PATH))
        }
    }
}

/// sign_out
///
/// [Public Route] Destroys the current session. The provider-side revoke is
/// best effort; the cookies are cleared regardless so the browser ends up
/// signed out even when the provider is unreachable.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 303, description = "Cookies cleared, redirected to login"))
)]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(token) = cookies::access_token(&jar) {
        if let Err(e) = state.provider.sign_out(&token).await {
            tracing::warn!(error = %e, "provider sign-out failed, clearing cookies anyway");
        }
    }

    let (access, refresh) = cookies::clear_session_cookies();
    (jar.add(access).add(refresh), Redirect::to(LOGIN_PATH))
}

// --- Protected Handlers ---

/// get_me
///
/// [Protected Route] The authenticated user's profile, fetched fresh from
/// the identity provider rather than read out of the token, so a user
/// deleted at the provider stops resolving immediately.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Token no longer accepted")
    )
)]
pub async fn get_me(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    match state.provider.get_user(&user.access_token).await {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "profile lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// get_dashboard
///
/// [Protected Route] Summary document for the dashboard shell: who is signed
/// in and how long the session lasts. Built entirely from the resolved
/// identity, no provider call.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard summary", body = DashboardView))
)]
pub async fn get_dashboard(user: CurrentUser) -> Json<DashboardView> {
    Json(DashboardView {
        subject_id: user.id,
        email: user.email,
        session_expires_at: user.expires_at,
    })
}

// --- Fallback ---

/// not_found
///
/// Registered as the router fallback so the session guard layer also runs
/// for paths without a handler; an unknown protected path still redirects
/// to login instead of leaking a bare 404.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
