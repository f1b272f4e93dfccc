use crate::{
    api::{self, GatewaySettings, GatewayState},
    audit::{AccessRecorder, AppEvent, AuditLogger, EventType},
    cli::commands::auth::AuthMode,
    credentials::CredentialStore,
    error::ConfigError,
    gateway::AccessKeyGateway,
    geo::GeoResolver,
    oauth::{OAuthClient, OAuthConfig},
    session::SessionManager,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub mode: AuthMode,
    pub users: Option<String>,
    pub access_keys: Option<SecretString>,
    pub session_ttl_seconds: i64,
    pub app_url: String,
    pub login_url: String,
    pub oauth: Option<OAuthConfig>,
    pub log_dir: PathBuf,
    pub geo_url: String,
    pub geo_timeout: Duration,
}

/// Both variables must be present; a missing one is an empty list.
fn load_credentials(users: Option<&str>, access_keys: Option<&str>) -> Result<CredentialStore, ConfigError> {
    CredentialStore::from_json(users.unwrap_or("[]"), access_keys.unwrap_or("[]"))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the log directory cannot be prepared, an HTTP client
/// cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {:?}", args);

    let audit = Arc::new(
        AuditLogger::open(&args.log_dir)
            .await
            .with_context(|| format!("Failed to open log directory {}", args.log_dir.display()))?,
    );
    let geo = Arc::new(
        GeoResolver::new(&args.geo_url, args.geo_timeout)
            .context("Failed to build geolocation client")?,
    );
    let recorder = AccessRecorder::new(audit.clone(), geo);
    let sessions = Arc::new(SessionManager::new(chrono::Duration::seconds(
        args.session_ttl_seconds,
    )));

    audit
        .write(AppEvent::info("tutorgate starting").with_details(&format!(
            "version={} commit={} auth_mode={}",
            env!("CARGO_PKG_VERSION"),
            crate::GIT_COMMIT_HASH,
            args.mode.as_str()
        )))
        .await;
    recorder
        .record(
            "localhost",
            EventType::AppStart,
            &format!("Gateway listening on port {}", args.port),
        )
        .await;

    let mut state = GatewayState::new(
        sessions.clone(),
        recorder.clone(),
        GatewaySettings::new(&args.app_url, &args.login_url),
    );

    if args.mode.access_key() {
        let store = load_credentials(
            args.users.as_deref(),
            args.access_keys.as_ref().map(|keys| keys.expose_secret()),
        );
        if let Err(err) = &store {
            audit
                .write(
                    AppEvent::error("Access-key authentication disabled")
                        .with_details(&err.to_string()),
                )
                .await;
        }
        state = state.with_access_key(AccessKeyGateway::new(store, sessions.clone(), recorder.clone()));
    }

    if let Some(config) = args.oauth {
        info!("OAuth login enabled, callback {}", config.redirect_uri);
        let client = OAuthClient::new(config, sessions.clone(), recorder.clone())
            .context("Failed to build OAuth client")?;
        state = state.with_oauth(client);
    }

    let _sweeper = sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);

    api::new(args.port, Arc::new(state)).await
}
