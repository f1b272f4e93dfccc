//! Access-key login path.
//!
//! Flow Overview:
//! 1) The client hashes the access key (SHA-256, hex) before sending it.
//! 2) The digest is checked against the credential store.
//! 3) Success mints a session; every outcome is written to the access stream.
//!
//! Security boundaries: a store that failed to load puts the gateway in a
//! fail-closed state where every attempt is an `AUTH_ERROR`. Unknown users and
//! wrong keys produce the same caller-visible failure.

use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::audit::{AccessRecorder, EventType};
use crate::credentials::{is_sha256_hex, CredentialStore};
use crate::error::{AuthFailure, ConfigError};
use crate::session::{AuthMethod, Session, SessionManager};

#[derive(Debug)]
pub struct AccessKeyGateway {
    store: Result<CredentialStore, ConfigError>,
    sessions: Arc<SessionManager>,
    recorder: AccessRecorder,
}

impl AccessKeyGateway {
    #[must_use]
    pub fn new(
        store: Result<CredentialStore, ConfigError>,
        sessions: Arc<SessionManager>,
        recorder: AccessRecorder,
    ) -> Self {
        match &store {
            Ok(store) => info!("access-key authentication enabled for {} users", store.len()),
            Err(err) => error!("access-key authentication disabled: {err}"),
        }
        Self {
            store,
            sessions,
            recorder,
        }
    }

    /// The load error, when the gateway is running fail-closed.
    #[must_use]
    pub fn config_error(&self) -> Option<&ConfigError> {
        self.store.as_ref().err()
    }

    /// Verify a client-hashed access key and mint a session.
    ///
    /// # Errors
    /// `AuthFailure::Rejected` for unknown users, wrong keys and malformed
    /// digests; `AuthFailure::Unavailable` when the credential store is not
    /// usable.
    #[instrument(skip(self, client_hash))]
    pub async fn authenticate(
        &self,
        username: &str,
        client_hash: &str,
        request_ip: &str,
    ) -> Result<Session, AuthFailure> {
        let store = match &self.store {
            Ok(store) => store,
            Err(err) => {
                self.recorder
                    .record(
                        request_ip,
                        EventType::AuthError,
                        &format!("Authentication error: {err}"),
                    )
                    .await;
                return Err(AuthFailure::Unavailable);
            }
        };

        let username = username.trim();
        if username.is_empty() || !is_sha256_hex(client_hash.trim()) {
            self.recorder
                .record(
                    request_ip,
                    EventType::AuthFailed,
                    &format!("Malformed login request for user: {username}"),
                )
                .await;
            return Err(AuthFailure::Rejected);
        }

        if !store.verify(username, client_hash) {
            let details = if store.credentials().any(|c| c.username == username) {
                format!("Invalid access key for user: {username}")
            } else {
                format!("Username not found: {username}")
            };
            self.recorder
                .record(request_ip, EventType::AuthFailed, &details)
                .await;
            return Err(AuthFailure::Rejected);
        }

        match self.sessions.create(username, AuthMethod::AccessKey).await {
            Ok(session) => {
                self.recorder
                    .record(
                        request_ip,
                        EventType::AuthSuccess,
                        &format!("User authenticated: {username}"),
                    )
                    .await;
                Ok(session)
            }
            Err(err) => {
                error!("failed to create session: {err}");
                self.recorder
                    .record(
                        request_ip,
                        EventType::AuthError,
                        &format!("Session creation failed for user: {username}"),
                    )
                    .await;
                Err(AuthFailure::Unavailable)
            }
        }
    }
}
