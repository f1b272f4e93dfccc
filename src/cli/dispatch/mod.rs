//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action. OAuth settings are checked here
//! so a server with OAuth enabled but unconfigured never starts.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, logging, oauth, ARG_PORT};
use crate::oauth::OAuthConfig;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if arguments are inconsistent or OAuth is enabled without
/// a complete client configuration.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(7860);

    let auth_opts = auth::Options::parse(matches)?;
    let oauth_opts = oauth::Options::parse(matches)?;
    let logging_opts = logging::Options::parse(matches)?;

    let oauth = if auth_opts.mode.oauth() {
        let config = OAuthConfig::google(
            oauth_opts.client_id,
            oauth_opts.client_secret,
            oauth_opts.redirect_uri,
        )
        .context("OAuth login is enabled but not configured")?
        .with_state_ttl(chrono::Duration::seconds(oauth_opts.state_ttl_seconds));
        Some(config)
    } else {
        None
    };

    Ok(Action::Server(Args {
        port,
        mode: auth_opts.mode,
        users: auth_opts.users,
        access_keys: auth_opts.access_keys,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        app_url: auth_opts.app_url,
        login_url: auth_opts.login_url,
        oauth,
        log_dir: logging_opts.log_dir,
        geo_url: logging_opts.geo_url,
        geo_timeout: logging_opts.geo_timeout,
    }))
}
