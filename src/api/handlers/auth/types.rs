use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::session::Session;

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    /// Hex SHA-256 digest of the access key, computed by the client.
    #[serde(rename = "hashedPassword")]
    pub hashed_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionResponse {
    pub user: String,
    pub method: String,
    /// RFC 3339
    pub expires_at: String,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            user: session.subject.clone(),
            method: session.method.as_str().to_string(),
            expires_at: session.expires_at.to_rfc3339(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub user: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct StartParams {
    /// Must match the configured callback URI when present.
    pub redirect_uri: Option<String>,
}
