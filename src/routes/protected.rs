use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Protected Router Module
///
/// Defines the routes that require a session. The server guard already
/// redirects unauthenticated browsers away from these paths; the
/// `require_session` layer applied in `create_router` is the second,
/// independent check, rejecting with 401 anything that slips past the
/// guard (for instance during a fail-open pass-through).
pub fn protected_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Summary document for the authenticated dashboard shell.
        .route("/dashboard", get(handlers::get_dashboard))
        // GET /me
        // The authenticated user's profile, fetched fresh from the provider.
        .route("/me", get(handlers::get_me))
}
