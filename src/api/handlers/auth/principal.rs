//! Session guard for routes of the wrapped application.
//!
//! Flow Overview: read the bearer header or session cookie, resolve it
//! against the session store, and hand back the live session.

use axum::http::{HeaderMap, StatusCode};

use super::session::extract_session_token;
use crate::api::GatewayState;
use crate::session::Session;

/// Resolve a session token into the live session, or return 401.
///
/// # Errors
/// `StatusCode::UNAUTHORIZED` when no token is presented or it is unknown or
/// expired.
pub async fn require_session(headers: &HeaderMap, state: &GatewayState) -> Result<Session, StatusCode> {
    let token = extract_session_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    state
        .sessions()
        .validate(&token)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)
}
