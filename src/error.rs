//! Error taxonomy shared by both login paths.
//!
//! `ConfigError` is fatal for the path it affects. `AuthFailure` and
//! `OAuthFailure` are per request and are converted into generic user-visible
//! outcomes at the HTTP boundary. Geo and log-write errors never leave their
//! modules.

use crate::audit::EventType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("USERS has {users} entries but ACCESS_KEYS has {keys}")]
    LengthMismatch { users: usize, keys: usize },
    #[error("no access-key credentials configured")]
    Empty,
    #[error("malformed {field}: {reason}")]
    MalformedJson { field: &'static str, reason: String },
    #[error("invalid credential entry at index {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
    #[error("missing OAuth configuration: {0}")]
    MissingOAuth(&'static str),
}

/// Access-key login failure.
///
/// `Rejected` covers both unknown usernames and wrong keys so callers cannot
/// tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("invalid username or access key")]
    Rejected,
    #[error("access-key authentication unavailable")]
    Unavailable,
}

impl AuthFailure {
    #[must_use]
    pub fn event_type(self) -> EventType {
        match self {
            Self::Rejected => EventType::AuthFailed,
            Self::Unavailable => EventType::AuthError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthFailure {
    #[error("invalid or expired state")]
    InvalidState,
    #[error("redirect URI not allowed: {0}")]
    RedirectNotAllowed(String),
    #[error("authorization denied by provider: {0}")]
    Denied(String),
    #[error("missing authorization code")]
    MissingCode,
    #[error("token exchange rejected: {0}")]
    ExchangeRejected(String),
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("identity lookup failed: {0}")]
    IdentityFetch(String),
    #[error("identity has no email address")]
    MissingEmail,
    #[error("failed to build authorization URL: {0}")]
    AuthorizeUrl(String),
    #[error("session unavailable: {0}")]
    Session(String),
}

impl OAuthFailure {
    /// Audit classification: failures caused by the user or the provider's
    /// verdict are `AUTH_FAILED`, everything else is `AUTH_ERROR`.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Denied(_)
            | Self::MissingCode
            | Self::ExchangeRejected(_)
            | Self::MissingEmail => EventType::AuthFailed,
            Self::InvalidState
            | Self::RedirectNotAllowed(_)
            | Self::ExchangeFailed(_)
            | Self::IdentityFetch(_)
            | Self::AuthorizeUrl(_)
            | Self::Session(_) => EventType::AuthError,
        }
    }
}
