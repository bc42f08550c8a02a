use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once
/// loaded, shared across all requests through the unified application state,
/// and pulled into extractors via FromRef.
#[derive(Clone)]
pub struct AppConfig {
    // Base URL of the hosted identity provider (Supabase project URL).
    pub provider_url: String,
    // Public API key sent as the `apikey` header on every provider call.
    pub provider_api_key: String,
    // Secret used to validate incoming access-token JWTs locally.
    pub jwt_secret: String,
    // Runtime environment marker. Controls log format and cookie security.
    pub env: Env,
    // Whether session cookies carry the Secure attribute.
    pub secure_cookies: bool,
}

/// Env
///
/// Defines the runtime context, switching between development conveniences
/// (pretty logs, insecure cookies over plain HTTP) and production settings
/// (JSON logs, Secure cookies).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup, without requiring any environment variables.
    fn default() -> Self {
        Self {
            provider_url: "http://localhost:54321".to_string(),
            provider_api_key: "local-anon-key".to_string(),
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            env: Env::Local,
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing configuration at startup.
    /// Reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if a variable required for the current runtime environment
    /// (especially Production) is not set. Starting with an incomplete or
    /// insecure configuration is not an option.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // JWT Secret Resolution
        // The production secret is mandatory and must be explicitly set.
        let jwt_secret = match env {
            Env::Production => env::var("SUPABASE_JWT_SECRET")
                .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            _ => env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| "super-secure-test-secret-value-local".to_string()),
        };

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Local Supabase stack default; override to point elsewhere.
                provider_url: env::var("SUPABASE_URL")
                    .unwrap_or_else(|_| "http://localhost:54321".to_string()),
                provider_api_key: env::var("SUPABASE_ANON_KEY")
                    .unwrap_or_else(|_| "local-anon-key".to_string()),
                jwt_secret,
                secure_cookies: false,
            },
            Env::Production => Self {
                env: Env::Production,
                provider_url: env::var("SUPABASE_URL")
                    .expect("FATAL: SUPABASE_URL required in prod"),
                provider_api_key: env::var("SUPABASE_ANON_KEY")
                    .expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                jwt_secret,
                secure_cookies: true,
            },
        }
    }
}
