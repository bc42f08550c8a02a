use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use time::Duration;

use crate::models::Session;

/// Cookie carrying the short-lived access-token JWT.
pub const ACCESS_COOKIE_NAME: &str = "ap-access-token";
/// Cookie carrying the opaque refresh token.
pub const REFRESH_COOKIE_NAME: &str = "ap-refresh-token";

// The refresh cookie outlives the access token so the guard can restore a
// session long after the JWT expires.
const REFRESH_TTL_DAYS: i64 = 30;

/// Build the access/refresh cookie pair for a freshly issued session.
///
/// Both cookies are HttpOnly with SameSite=Lax; the Secure attribute follows
/// the runtime environment. The access cookie's max-age tracks the session
/// expiry so the browser drops it roughly when the token dies.
pub fn session_cookies(session: &Session, secure: bool) -> (Cookie<'static>, Cookie<'static>) {
    let remaining = (session.expires_at - Utc::now()).num_seconds().max(0);

    let access = Cookie::build((ACCESS_COOKIE_NAME, session.access_token.clone()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(remaining))
        .build();

    let refresh = Cookie::build((REFRESH_COOKIE_NAME, session.refresh_token.clone()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(REFRESH_TTL_DAYS))
        .build();

    (access, refresh)
}

/// Build removal twins for the session cookie pair (sign-out).
pub fn clear_session_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let access = Cookie::build((ACCESS_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    let refresh = Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    (access, refresh)
}

/// Get the access token from the request cookies.
pub fn access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the refresh token from the request cookies.
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Append Set-Cookie headers for a session refreshed mid-request by the
/// server guard, so the browser picks up the replacement tokens on the
/// response it already has in flight.
pub fn append_session_cookies(headers: &mut HeaderMap, session: &Session, secure: bool) {
    let (access, refresh) = session_cookies(session, secure);
    for cookie in [access, refresh] {
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}
