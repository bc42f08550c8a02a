use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints reachable without a session. These are the landing
/// page, the health probe, and the authentication flow itself.
///
/// The server guard still inspects every one of these requests: an already
/// authenticated browser asking for an auth page is redirected to the
/// dashboard before any handler below runs, with the callback as the one
/// carve-out.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Landing document; stays reachable with or without a session.
        .route("/", get(handlers::home))
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /auth/login
        // The login page document, including the error code from a failed
        // attempt. POST on the same path performs the password sign-in.
        .route(
            "/auth/login",
            get(handlers::login_page).post(handlers::sign_in),
        )
        // GET /auth/callback
        // Completes the external identity redirect by exchanging the
        // one-time code for a session. Reachable even when authenticated.
        .route("/auth/callback", get(handlers::auth_callback))
        // POST /auth/logout
        // Destroys the session and clears the cookie pair.
        .route("/auth/logout", post(handlers::sign_out))
}
