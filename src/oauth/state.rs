//! Pending OAuth authorization requests.
//!
//! Each `/auth/start` stores one [`OAuthState`] in the `AwaitingCallback`
//! phase. The entry is removed on the first callback that presents its token,
//! whatever the outcome, so a state can never be replayed. Expired entries are
//! pruned whenever a new state is issued.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{OAuthPhase, PhaseEvent};

pub const DEFAULT_STATE_TTL_SECONDS: i64 = 10 * 60;
pub const MAX_STATE_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthState {
    pub state_token: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub phase: OAuthPhase,
}

fn generate_state_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate OAuth state token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Debug)]
pub(crate) struct StateTable {
    ttl: chrono::Duration,
    states: Mutex<HashMap<String, OAuthState>>,
}

impl StateTable {
    pub(crate) fn new(ttl: chrono::Duration) -> Self {
        Self {
            ttl,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn issue(&self, redirect_uri: &str) -> Result<OAuthState> {
        self.issue_at(redirect_uri, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .context("OAuth state expiry out of range")?;
        let mut states = self.states.lock().await;
        states.retain(|_, entry| now < entry.expires_at);
        let state_token = loop {
            let candidate = generate_state_token()?;
            if !states.contains_key(&candidate) {
                break candidate;
            }
        };
        let state = OAuthState {
            state_token: state_token.clone(),
            redirect_uri: redirect_uri.to_string(),
            created_at: now,
            expires_at,
            phase: OAuthPhase::Init.advance(PhaseEvent::Begin),
        };
        states.insert(state_token, state.clone());
        Ok(state)
    }

    /// Consume a state. Expired entries, and entries no longer awaiting a
    /// callback, are removed but not returned.
    pub(crate) async fn take(&self, state_token: &str) -> Option<OAuthState> {
        self.take_at(state_token, Utc::now()).await
    }

    pub(crate) async fn take_at(&self, state_token: &str, now: DateTime<Utc>) -> Option<OAuthState> {
        let mut states = self.states.lock().await;
        states
            .remove(state_token)
            .filter(|state| now < state.expires_at)
            .filter(|state| state.phase == OAuthPhase::AwaitingCallback)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.states.lock().await.len()
    }
}
