//! Access-key login endpoint.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

use super::session::session_cookie;
use super::types::{ErrorResponse, LoginRequest, SessionResponse};
use super::utils::extract_client_ip;
use crate::api::GatewayState;

const LOGIN_FAILED: &str = "invalid username or access key";

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Login rejected", body = ErrorResponse),
        (status = 404, description = "Access-key login is disabled")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    state: Extension<Arc<GatewayState>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let Some(gateway) = state.access_key() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let ip = extract_client_ip(&headers, Some(peer));
    let session = match gateway
        .authenticate(&request.username, &request.hashed_password, &ip)
        .await
    {
        Ok(session) => session,
        // Store outages and wrong keys look the same to the caller.
        Err(_) => {
            return (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(LOGIN_FAILED)))
                .into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    let max_age = state.sessions().ttl().num_seconds();
    match session_cookie(state.settings(), &session.token, max_age) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            state.sessions().invalidate(&session.token).await;
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (
        StatusCode::OK,
        response_headers,
        Json(SessionResponse::from(&session)),
    )
        .into_response()
}
