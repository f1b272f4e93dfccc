//! OAuth redirect endpoints.
//!
//! Both endpoints answer with `302 Found`. Failures on the callback are
//! reported to the browser only as a generic `error=oauth_failed` on the login
//! page; the cause is in the access stream.

use axum::{
    extract::{ConnectInfo, Extension, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, warn};

use super::session::session_cookie;
use super::types::{ErrorResponse, StartParams};
use super::utils::extract_client_ip;
use crate::api::GatewayState;
use crate::error::OAuthFailure;
use crate::oauth::CallbackParams;

const FAILURE_QUERY: &str = "error=oauth_failed";

fn found(location: &str) -> Result<(StatusCode, HeaderMap), StatusCode> {
    let value = HeaderValue::from_str(location).map_err(|err| {
        error!("Invalid redirect location: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, value);
    Ok((StatusCode::FOUND, headers))
}

fn login_failure_location(login_url: &str) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{FAILURE_QUERY}")
}

#[utoipa::path(
    get,
    path = "/auth/start",
    params(StartParams),
    responses(
        (status = 302, description = "Redirect to the provider authorization page"),
        (status = 400, description = "Redirect URI not allowed", body = ErrorResponse),
        (status = 404, description = "OAuth login is disabled")
    ),
    tag = "oauth"
)]
pub async fn start(
    state: Extension<Arc<GatewayState>>,
    Query(params): Query<StartParams>,
) -> impl IntoResponse {
    let Some(client) = state.oauth() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match client.begin_login(params.redirect_uri.as_deref()).await {
        Ok(url) => found(url.as_str()).into_response(),
        Err(err @ OAuthFailure::RedirectNotAllowed(_)) => {
            warn!("{err}");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("redirect_uri not allowed")),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to start OAuth login: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "State issued by /auth/start"),
        ("error" = Option<String>, Query, description = "Provider error")
    ),
    responses(
        (status = 302, description = "Redirect to the application on success, or to the login page on failure"),
        (status = 404, description = "OAuth login is disabled")
    ),
    tag = "oauth"
)]
pub async fn callback(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    state: Extension<Arc<GatewayState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let Some(client) = state.oauth() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let ip = extract_client_ip(&headers, Some(peer));
    let settings = state.settings();
    let session = match client.handle_callback(&params, &ip).await {
        Ok(session) => session,
        Err(_) => return found(&login_failure_location(&settings.login_url)).into_response(),
    };

    let max_age = state.sessions().ttl().num_seconds();
    let cookie = match session_cookie(settings, &session.token, max_age) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            state.sessions().invalidate(&session.token).await;
            return found(&login_failure_location(&settings.login_url)).into_response();
        }
    };

    match found(&settings.app_url) {
        Ok((status, mut response_headers)) => {
            response_headers.insert(SET_COOKIE, cookie);
            (status, response_headers).into_response()
        }
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_location_appends_query() {
        assert_eq!(login_failure_location("/"), "/?error=oauth_failed");
        assert_eq!(
            login_failure_location("https://tutor.example.com/login?next=/lab"),
            "https://tutor.example.com/login?next=/lab&error=oauth_failed"
        );
    }
}
