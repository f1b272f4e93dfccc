use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::oauth::{DEFAULT_STATE_TTL_SECONDS, MAX_STATE_TTL_SECONDS};

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_REDIRECT_URI: &str = "google-redirect-uri";
pub const ARG_OAUTH_STATE_TTL_SECONDS: &str = "oauth-state-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    pub state_ttl_seconds: i64,
}

impl Options {
    /// Parse OAuth client arguments from matches. Presence is checked later,
    /// and only when OAuth is enabled.
    ///
    /// # Errors
    /// Returns an error if the state TTL is outside `1..=MAX_STATE_TTL_SECONDS`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let state_ttl_seconds = matches
            .get_one::<i64>(ARG_OAUTH_STATE_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_STATE_TTL_SECONDS);
        if !(1..=MAX_STATE_TTL_SECONDS).contains(&state_ttl_seconds) {
            anyhow::bail!(
                "--{ARG_OAUTH_STATE_TTL_SECONDS} must be between 1 and {MAX_STATE_TTL_SECONDS}"
            );
        }

        Ok(Self {
            client_id: get_non_empty(ARG_GOOGLE_CLIENT_ID),
            client_secret: get_non_empty(ARG_GOOGLE_CLIENT_SECRET).map(SecretString::from),
            redirect_uri: get_non_empty(ARG_GOOGLE_REDIRECT_URI),
            state_ttl_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client ID")
                .env("GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_REDIRECT_URI)
                .long(ARG_GOOGLE_REDIRECT_URI)
                .help("Callback URI registered with Google, e.g. https://host/auth/callback")
                .env("GOOGLE_REDIRECT_URI"),
        )
        .arg(
            Arg::new(ARG_OAUTH_STATE_TTL_SECONDS)
                .long(ARG_OAUTH_STATE_TTL_SECONDS)
                .help("Lifetime of a pending OAuth state in seconds")
                .env("TUTORGATE_OAUTH_STATE_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
}
