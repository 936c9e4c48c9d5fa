use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use time::Duration;
use uuid::Uuid;

use crate::error::Error;
use crate::state::AppState;

/// Pull the session token out of the Cookie header, if any.
pub(crate) fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == cookie_name).then(|| value.to_string())
    })
}

/// Set-Cookie value carrying the session token. HttpOnly keeps it away from
/// scripts; Secure is enabled in production via config.
pub(crate) fn session_cookie(name: &str, token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.whole_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Set-Cookie value that removes the session cookie from the client.
pub(crate) fn clear_session_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", Duration::ZERO, secure)
}

/// Request gate for protected routes: resolves the session cookie to an
/// authenticated identity or rejects with 401 before the handler runs.
/// Pure lookup; mutates nothing beyond the store's lazy expiry.
pub struct AuthSession {
    pub token: String,
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.session.cookie_name)
            .ok_or(Error::Unauthenticated)?;
        let session = state
            .auth
            .resolve_session(&token)
            .await?
            .ok_or(Error::Unauthenticated)?;
        Ok(AuthSession {
            token,
            user_id: session.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_the_session_cookie_among_others() {
        let headers = headers_with_cookie("theme=dark; sid=abc123; lang=en");
        assert_eq!(session_token(&headers, "sid"), Some("abc123".to_string()));
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(session_token(&HeaderMap::new(), "sid"), None);
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(session_token(&headers, "sid"), None);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let headers = headers_with_cookie("sid2=abc");
        assert_eq!(session_token(&headers, "sid"), None);
    }

    #[test]
    fn session_cookie_is_http_only_with_max_age() {
        let cookie = session_cookie("sid", "tok", Duration::days(7), false);
        assert_eq!(cookie, "sid=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800");
        let secure = session_cookie("sid", "tok", Duration::days(7), true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("sid", false);
        assert!(cookie.starts_with("sid=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
