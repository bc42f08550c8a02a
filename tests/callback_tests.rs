use agency_portal::{
    AppState, MockIdentityProvider, ProviderState, config::AppConfig, create_router,
    models::Session,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_USER_ID: Uuid = Uuid::from_u128(7);

fn test_session(user_id: Uuid) -> Session {
    let now = Utc::now();
    Session {
        subject_id: user_id,
        issued_at: now,
        expires_at: now + chrono::Duration::hours(1),
        access_token: "provider-issued-access-token".to_string(),
        refresh_token: "provider-issued-refresh-token".to_string(),
    }
}

async fn spawn_app(provider: ProviderState) -> String {
    let state = AppState {
        provider,
        config: AppConfig::default(),
    };
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

fn session_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

// --- Tests ---

#[tokio::test]
async fn callback_with_valid_code_sets_session_and_redirects_home() {
    let mock = MockIdentityProvider::with_session(test_session(TEST_USER_ID));
    let address = spawn_app(Arc::new(mock)).await;

    let response = client()
        .get(format!("{}/auth/callback?code=one-time-code", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let cookies = session_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("ap-access-token=provider-issued-access-token"))
    );
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("ap-refresh-token=provider-issued-refresh-token"))
    );
}

#[tokio::test]
async fn callback_without_code_redirects_to_login() {
    let mock = MockIdentityProvider::with_session(test_session(TEST_USER_ID));
    let address = spawn_app(Arc::new(mock)).await;

    let response = client()
        .get(format!("{}/auth/callback", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
    assert!(session_cookies(&response).is_empty());
}

#[tokio::test]
async fn callback_with_rejected_code_redirects_to_login() {
    // No session configured: every exchange is rejected.
    let address = spawn_app(Arc::new(MockIdentityProvider::new())).await;

    let response = client()
        .get(format!("{}/auth/callback?code=forged", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
    assert!(session_cookies(&response).is_empty());
}

#[tokio::test]
async fn callback_swallows_provider_outage() {
    let address = spawn_app(Arc::new(MockIdentityProvider::new_failing())).await;

    // A provider failure mid-exchange is still a redirect, never a 5xx.
    let response = client()
        .get(format!("{}/auth/callback?code=one-time-code", address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn callback_with_provider_error_param_redirects_to_login() {
    let mock = MockIdentityProvider::with_session(test_session(TEST_USER_ID));
    let address = spawn_app(Arc::new(mock)).await;

    let response = client()
        .get(format!(
            "{}/auth/callback?error=access_denied&error_description=user+cancelled",
            address
        ))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login");
}
