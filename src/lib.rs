use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gate;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod store;

// Module for routing segregation (Public, Protected).
pub mod routes;
use auth::CurrentUser; // The resolved authenticated identity.
use routes::{protected, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use provider::{HttpIdentityProvider, MockIdentityProvider, ProviderState};
pub use store::AuthStore;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the portal.
/// Aggregates all handler paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::home, handlers::login_page, handlers::sign_in,
        handlers::auth_callback, handlers::sign_out, handlers::get_me,
        handlers::get_dashboard
    ),
    components(
        schemas(
            models::Session, models::AuthState, models::UserProfile,
            models::SignInRequest, models::DashboardView,
        )
    ),
    tags(
        (name = "agency-portal", description = "Agency Management Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding the application's
/// shared services and configuration; every incoming request sees the same
/// state through cheap clones.
#[derive(Clone)]
pub struct AppState {
    /// Identity layer: the external provider behind a trait object.
    pub provider: ProviderState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow extractors to selectively pull components from the shared
// AppState instead of taking the whole state.

impl FromRef<AppState> for ProviderState {
    fn from_ref(app_state: &AppState) -> ProviderState {
        app_state.provider.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_session
///
/// A middleware function enforcing authentication for the protected routes.
///
/// *Mechanism*: it attempts to extract `CurrentUser` from the request. Since
/// `CurrentUser` implements `FromRequestParts`, a request without a valid
/// session is rejected with 401 before the handler runs. This is the second
/// line behind the session guard: the guard redirects browsers, this layer
/// stops anything that passed through on the guard's fail-open path.
async fn require_session(_user: CurrentUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the session guard and the
/// global middleware layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: landing page, health, and the auth flow.
        .merge(public::public_routes())
        // Protected routes: wrapped in the `require_session` layer.
        .merge(
            protected::protected_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_session,
            )),
        )
        // Unmatched paths land here so the guard below still sees them; an
        // unknown protected path redirects to login, not to a bare 404.
        .fallback(handlers::not_found)
        // The server-side route guard runs before every request above:
        // classify the path, resolve/refresh the session, redirect or pass.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::session_guard,
        ))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle
                // in a span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer (outermost).
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the span created by `TraceLayer`: includes the `x-request-id`
/// header (if present) alongside the HTTP method and URI, so every log line
/// for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
