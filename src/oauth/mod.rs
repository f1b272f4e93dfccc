//! Google OAuth login path (authorization-code flow).
//!
//! Flow Overview:
//! 1) `begin_login` issues a single-use `state` and returns the provider's
//!    authorization URL.
//! 2) The provider redirects back with `code` and `state`.
//! 3) `handle_callback` consumes the state, exchanges the code for an access
//!    token, fetches the user's email and mints a session.
//!
//! The state is consumed before anything else is checked, so a callback can
//! only ever be attempted once per `/auth/start`.

mod client;
mod state;

pub use client::{CallbackParams, OAuthClient};
pub use state::{OAuthState, DEFAULT_STATE_TTL_SECONDS, MAX_STATE_TTL_SECONDS};

use secrecy::SecretString;
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const OAUTH_SCOPE: &str = "openid email profile";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub state_ttl: chrono::Duration,
    pub http_timeout: Duration,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("state_ttl", &self.state_ttl)
            .finish_non_exhaustive()
    }
}

impl OAuthConfig {
    /// Google endpoints with the given client registration.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingOAuth` naming the first absent value.
    pub fn google(
        client_id: Option<String>,
        client_secret: Option<SecretString>,
        redirect_uri: Option<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingOAuth("GOOGLE_CLIENT_ID"))?;
        let client_secret = client_secret.ok_or(ConfigError::MissingOAuth("GOOGLE_CLIENT_SECRET"))?;
        let redirect_uri = redirect_uri
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingOAuth("GOOGLE_REDIRECT_URI"))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            state_ttl: chrono::Duration::seconds(DEFAULT_STATE_TTL_SECONDS),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Point the flow at other provider endpoints (tests use a mock server).
    #[must_use]
    pub fn with_endpoints(mut self, authorize_url: &str, token_url: &str, userinfo_url: &str) -> Self {
        self.authorize_url = authorize_url.to_string();
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    #[must_use]
    pub fn with_state_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

/// Lifecycle of one login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthPhase {
    Init,
    AwaitingCallback,
    Authenticated,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEvent {
    Begin,
    CallbackAccepted,
    CallbackRejected,
}

impl OAuthPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    /// Apply an event. Terminal phases never change; any other out-of-order
    /// event fails the attempt.
    #[must_use]
    pub fn advance(self, event: PhaseEvent) -> Self {
        match (self, event) {
            (phase, _) if phase.is_terminal() => phase,
            (Self::Init, PhaseEvent::Begin) => Self::AwaitingCallback,
            (Self::AwaitingCallback, PhaseEvent::CallbackAccepted) => Self::Authenticated,
            _ => Self::Failed,
        }
    }
}
