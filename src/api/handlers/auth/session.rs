//! Session endpoints for cookie and bearer auth.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

use super::types::AuthStatusResponse;
use super::utils::extract_client_ip;
use crate::api::{GatewaySettings, GatewayState};
use crate::audit::EventType;

pub const SESSION_COOKIE_NAME: &str = "tutorgate_session";

#[utoipa::path(
    get,
    path = "/auth/status",
    responses(
        (status = 200, description = "Whether the caller holds a live session", body = AuthStatusResponse)
    ),
    tag = "auth"
)]
pub async fn status(headers: HeaderMap, state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    let session = match extract_session_token(&headers) {
        Some(token) => state.sessions().validate(&token).await,
        None => None,
    };
    Json(AuthStatusResponse {
        authenticated: session.is_some(),
        user: session.map(|session| session.subject),
    })
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    state: Extension<Arc<GatewayState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Some(session) = state.sessions().invalidate(&token).await {
            let ip = extract_client_ip(&headers, Some(peer));
            state
                .recorder()
                .record(
                    &ip,
                    EventType::Logout,
                    &format!("User logged out: {}", session.subject),
                )
                .await;
        }
    }

    // Always clear the cookie, even if the session was already gone.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(state.settings()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build an `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    settings: &GatewaySettings,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(settings: &GatewaySettings) -> Result<HeaderValue, InvalidHeaderValue> {
    session_cookie(settings, "", 0)
}

/// Session token from a bearer header, else from the session cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_flags() {
        let plain = GatewaySettings::new("http://localhost:7860/", "/");
        let cookie = session_cookie(&plain, "abc", 60).map(|v| v.to_str().map(str::to_string));
        assert_eq!(
            cookie.ok().and_then(Result::ok).as_deref(),
            Some("tutorgate_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60")
        );

        let secure = GatewaySettings::new("https://tutor.example.com/", "/");
        let cleared = clear_session_cookie(&secure)
            .ok()
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.ends_with("; Secure"));
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; tutorgate_session=tok123; other=1"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn bearer_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("tutorgate_session=cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("tutorgate_session="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert_eq!(extract_session_token(&headers), None);
    }
}
