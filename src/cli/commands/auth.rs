use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::session::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS};

pub const ARG_AUTH_MODE: &str = "auth-mode";
pub const ARG_USERS: &str = "users";
pub const ARG_ACCESS_KEYS: &str = "access-keys";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_APP_URL: &str = "app-url";
pub const ARG_LOGIN_URL: &str = "login-url";

/// Which login paths are served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    AccessKey,
    OAuth,
    Both,
}

impl AuthMode {
    #[must_use]
    pub fn access_key(self) -> bool {
        matches!(self, Self::AccessKey | Self::Both)
    }

    #[must_use]
    pub fn oauth(self) -> bool {
        matches!(self, Self::OAuth | Self::Both)
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "access-key" => Some(Self::AccessKey),
            "oauth" => Some(Self::OAuth),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessKey => "access-key",
            Self::OAuth => "oauth",
            Self::Both => "both",
        }
    }
}

#[derive(Debug)]
pub struct Options {
    pub mode: AuthMode,
    pub users: Option<String>,
    pub access_keys: Option<SecretString>,
    pub session_ttl_seconds: i64,
    pub app_url: String,
    pub login_url: String,
}

impl Options {
    /// Parse login and session arguments from matches.
    ///
    /// # Errors
    /// Returns an error for an unknown auth mode or a session TTL outside
    /// `1..=MAX_SESSION_TTL_SECONDS`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let mode = matches
            .get_one::<String>(ARG_AUTH_MODE)
            .map_or(Some(AuthMode::AccessKey), |value| AuthMode::parse(value))
            .ok_or_else(|| anyhow::anyhow!("invalid value for --{ARG_AUTH_MODE}"))?;

        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_SESSION_TTL_SECONDS);
        if !(1..=MAX_SESSION_TTL_SECONDS).contains(&session_ttl_seconds) {
            anyhow::bail!(
                "--{ARG_SESSION_TTL_SECONDS} must be between 1 and {MAX_SESSION_TTL_SECONDS}"
            );
        }

        Ok(Self {
            mode,
            users: get_non_empty(ARG_USERS),
            access_keys: get_non_empty(ARG_ACCESS_KEYS).map(SecretString::from),
            session_ttl_seconds,
            app_url: get_non_empty(ARG_APP_URL).unwrap_or_else(|| "/".to_string()),
            login_url: get_non_empty(ARG_LOGIN_URL).unwrap_or_else(|| "/".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_MODE)
                .long(ARG_AUTH_MODE)
                .help("Login paths to serve")
                .env("TUTORGATE_AUTH_MODE")
                .default_value("access-key")
                .value_parser(PossibleValuesParser::new(["access-key", "oauth", "both"])),
        )
        .arg(
            Arg::new(ARG_USERS)
                .long(ARG_USERS)
                .help("JSON array of usernames, parallel to --access-keys")
                .env("USERS"),
        )
        .arg(
            Arg::new(ARG_ACCESS_KEYS)
                .long(ARG_ACCESS_KEYS)
                .help("JSON array of SHA-256 hex digests, parallel to --users")
                .env("ACCESS_KEYS")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("TUTORGATE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_APP_URL)
                .long(ARG_APP_URL)
                .help("Where the browser lands after a successful OAuth login")
                .env("TUTORGATE_APP_URL")
                .default_value("/"),
        )
        .arg(
            Arg::new(ARG_LOGIN_URL)
                .long(ARG_LOGIN_URL)
                .help("Where the browser lands after a failed OAuth login")
                .env("TUTORGATE_LOGIN_URL")
                .default_value("/"),
        )
}
