use agency_portal::{
    AppState, MockIdentityProvider, ProviderState,
    auth::Claims,
    config::AppConfig,
    create_router,
    guard::{GuardDecision, RouteClass, decide},
    models::Session,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        email: Some("agent@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn test_session(user_id: Uuid) -> Session {
    let now = Utc::now();
    Session {
        subject_id: user_id,
        issued_at: now,
        expires_at: now + chrono::Duration::hours(1),
        access_token: create_token(user_id, 3600),
        refresh_token: "refresh-token-1".to_string(),
    }
}

async fn spawn_app(provider: ProviderState) -> String {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    let state = AppState { provider, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// Client with redirects disabled, so 3xx responses can be asserted on.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// --- Classification & Decision Tables ---

#[test]
fn classify_partitions_every_path() {
    assert_eq!(RouteClass::classify("/"), RouteClass::Public);
    assert_eq!(RouteClass::classify("/health"), RouteClass::Public);
    assert_eq!(RouteClass::classify("/swagger-ui"), RouteClass::Public);
    assert_eq!(RouteClass::classify("/api-docs/openapi.json"), RouteClass::Public);

    assert_eq!(RouteClass::classify("/auth"), RouteClass::Auth);
    assert_eq!(RouteClass::classify("/auth/login"), RouteClass::Auth);
    assert_eq!(RouteClass::classify("/auth/logout"), RouteClass::Auth);

    // The carve-out stays reachable even when authenticated.
    assert_eq!(RouteClass::classify("/auth/callback"), RouteClass::AuthCallback);

    assert_eq!(RouteClass::classify("/dashboard"), RouteClass::Protected);
    assert_eq!(RouteClass::classify("/me"), RouteClass::Protected);
    assert_eq!(RouteClass::classify("/clients/42/invoices"), RouteClass::Protected);
}

#[test]
fn decision_table() {
    assert_eq!(decide(RouteClass::Protected, false), GuardDecision::ToLogin);
    assert_eq!(decide(RouteClass::Protected, true), GuardDecision::PassThrough);

    assert_eq!(decide(RouteClass::Auth, true), GuardDecision::ToDashboard);
    assert_eq!(decide(RouteClass::Auth, false), GuardDecision::PassThrough);

    // Callback and public paths are never redirected, session or not.
    assert_eq!(decide(RouteClass::AuthCallback, true), GuardDecision::PassThrough);
    assert_eq!(decide(RouteClass::AuthCallback, false), GuardDecision::PassThrough);
    assert_eq!(decide(RouteClass::Public, true), GuardDecision::PassThrough);
    assert_eq!(decide(RouteClass::Public, false), GuardDecision::PassThrough);
}

// --- End-to-End Redirect Scenarios ---

#[tokio::test]
async fn protected_path_without_session_redirects_to_login() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;

    let response = client()
        .get(format!("{}/dashboard", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn unknown_protected_path_without_session_redirects_to_login() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;

    // No handler is registered for this path; the guard still gates it.
    let response = client()
        .get(format!("{}/clients/42", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn auth_page_with_valid_session_redirects_to_dashboard() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;
    let token = create_token(TEST_USER_ID, 3600);

    let response = client()
        .get(format!("{}/auth/login", address))
        .header("Cookie", format!("ap-access-token={}", token))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn callback_with_valid_session_passes_through() {
    let mock = MockIdentityProvider::with_session(test_session(TEST_USER_ID));
    let address = spawn_app(Arc::new(mock)).await;
    let token = create_token(TEST_USER_ID, 3600);

    // The carve-out: an authenticated browser completing the exchange must
    // reach the callback handler instead of being bounced to the dashboard.
    let response = client()
        .get(format!("{}/auth/callback?code=one-time-code", address))
        .header("Cookie", format!("ap-access-token={}", token))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    // The handler's own redirect target, not the guard's.
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn public_paths_pass_through_without_session() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;

    let home = client().get(format!("{}/", address)).send().await.unwrap();
    assert_eq!(home.status(), 200);

    let health = client()
        .get(format!("{}/health", address))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn protected_path_with_valid_session_passes_through() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;
    let token = create_token(TEST_USER_ID, 3600);

    let response = client()
        .get(format!("{}/dashboard", address))
        .header("Cookie", format!("ap-access-token={}", token))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["subject_id"], TEST_USER_ID.to_string());
    assert_eq!(body["email"], "agent@example.com");
}

#[tokio::test]
async fn expired_access_token_is_refreshed_transparently() {
    let mock = MockIdentityProvider::with_session(test_session(TEST_USER_ID));
    let address = spawn_app(Arc::new(mock)).await;

    // Well past the validation leeway.
    let expired = create_token(TEST_USER_ID, -7200);

    let response = client()
        .get(format!("{}/dashboard", address))
        .header(
            "Cookie",
            format!("ap-access-token={}; ap-refresh-token=refresh-token-1", expired),
        )
        .send()
        .await
        .expect("req fail");

    // The request went through on the refreshed session...
    assert_eq!(response.status(), 200);

    // ...and the replacement cookies rode back on the response.
    let set_cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["subject_id"], TEST_USER_ID.to_string());
    assert!(set_cookies.iter().any(|c| c.starts_with("ap-access-token=")));
    assert!(set_cookies.iter().any(|c| c.starts_with("ap-refresh-token=")));
}

#[tokio::test]
async fn provider_outage_fails_open() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new_failing())).await;
    let expired = create_token(TEST_USER_ID, -7200);
    let cookies = format!("ap-access-token={}; ap-refresh-token=refresh-token-1", expired);

    // Public paths keep working through an outage.
    let home = client()
        .get(format!("{}/", address))
        .header("Cookie", cookies.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(home.status(), 200);

    // Protected paths pass the guard unmodified, then stop at the
    // require_session layer with 401 rather than an open door.
    let dashboard = client()
        .get(format!("{}/dashboard", address))
        .header("Cookie", cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(dashboard.status(), 401);
}

#[tokio::test]
async fn sign_out_with_session_reaches_its_handler() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;
    let token = create_token(TEST_USER_ID, 3600);

    // A POST under /auth is an action, not a page navigation; the guard must
    // not bounce it to the dashboard or sign-out becomes unreachable.
    let response = client()
        .post(format!("{}/auth/logout", address))
        .header("Cookie", format!("ap-access-token={}", token))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");

    // Removal cookies rode back on the response.
    let set_cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect();
    assert!(
        set_cookies
            .iter()
            .any(|c| c.starts_with("ap-access-token=;") || c.starts_with("ap-access-token=\"\""))
    );
}

#[tokio::test]
async fn rejected_refresh_token_is_no_session() {
    // Provider is reachable but refuses the refresh token.
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;
    let expired = create_token(TEST_USER_ID, -7200);

    let response = client()
        .get(format!("{}/dashboard", address))
        .header(
            "Cookie",
            format!("ap-access-token={}; ap-refresh-token=stale", expired),
        )
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
}
