//! In-memory session store shared by both login paths.
//!
//! Tokens are 256 random bits, URL-safe base64 encoded. The raw token is only
//! handed back to the caller (to set the cookie); the map is keyed by its
//! SHA-256 hash. Expiry is lazy: a session whose `expires_at` is not in the
//! future is treated as absent and dropped on lookup. [`SessionManager::spawn_sweeper`]
//! prunes the rest in the background.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::debug;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    AccessKey,
    OAuth,
}

impl AuthMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessKey => "access_key",
            Self::OAuth => "oauth",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub subject: String,
    pub method: AuthMethod,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Create a new session token for the auth cookie.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values are never used as map keys.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[derive(Debug)]
pub struct SessionManager {
    ttl: chrono::Duration,
    sessions: Mutex<HashMap<Vec<u8>, Session>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Mint a session for an authenticated subject.
    ///
    /// # Errors
    /// Returns an error if no random token can be generated or the expiry
    /// falls outside the representable time range.
    pub async fn create(&self, subject: &str, method: AuthMethod) -> Result<Session> {
        self.create_at(subject, method, Utc::now()).await
    }

    pub(crate) async fn create_at(
        &self,
        subject: &str,
        method: AuthMethod,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .context("session expiry out of range")?;
        let mut sessions = self.sessions.lock().await;
        // 256-bit tokens make a collision practically impossible; regenerate anyway.
        let (token, key) = loop {
            let token = generate_session_token()?;
            let key = hash_session_token(&token);
            if !sessions.contains_key(&key) {
                break (token, key);
            }
        };
        let session = Session {
            token,
            subject: subject.to_string(),
            method,
            created_at: now,
            expires_at,
        };
        sessions.insert(key, session.clone());
        debug!(method = method.as_str(), "session created");
        Ok(session)
    }

    pub async fn validate(&self, token: &str) -> Option<Session> {
        self.validate_at(token, Utc::now()).await
    }

    pub(crate) async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&key) {
            Some(session) if session.is_live_at(now) => Some(session.clone()),
            Some(_) => {
                sessions.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Remove a session. Returns the removed session if it existed.
    pub async fn invalidate(&self, token: &str) -> Option<Session> {
        let key = hash_session_token(token);
        self.sessions.lock().await.remove(&key)
    }

    /// Drop expired sessions, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_live_at(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Periodically purge expired sessions for memory hygiene.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let removed = manager.purge_expired().await;
                if removed > 0 {
                    debug!("purged {} expired sessions", removed);
                }
            }
        })
    }
}
