use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::time::Duration;

use crate::geo::DEFAULT_GEO_URL;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_DIR: &str = "log-dir";
pub const ARG_GEO_URL: &str = "geo-url";
pub const ARG_GEO_TIMEOUT_MS: &str = "geo-timeout-ms";

#[derive(Debug)]
pub struct Options {
    pub log_dir: PathBuf,
    pub geo_url: String,
    pub geo_timeout: Duration,
}

impl Options {
    /// Parse audit log and geo lookup arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the geo timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let log_dir = matches
            .get_one::<String>(ARG_LOG_DIR)
            .map_or_else(|| PathBuf::from("logs"), PathBuf::from);
        let geo_url = matches
            .get_one::<String>(ARG_GEO_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEO_URL.to_string());
        let timeout_ms = matches
            .get_one::<u64>(ARG_GEO_TIMEOUT_MS)
            .copied()
            .unwrap_or(2000);
        if timeout_ms == 0 {
            anyhow::bail!("--{ARG_GEO_TIMEOUT_MS} must be greater than zero");
        }
        Ok(Self {
            log_dir,
            geo_url,
            geo_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

/// Directory holding `access.log` and `app.log`; shared with `logview`.
#[must_use]
pub fn log_dir_arg() -> Arg {
    Arg::new(ARG_LOG_DIR)
        .long(ARG_LOG_DIR)
        .help("Directory for the audit streams")
        .env("TUTORGATE_LOG_DIR")
        .default_value("logs")
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TUTORGATE_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(log_dir_arg())
        .arg(
            Arg::new(ARG_GEO_URL)
                .long(ARG_GEO_URL)
                .help("Base URL of the ip-api.com compatible geolocation service")
                .env("TUTORGATE_GEO_URL")
                .default_value(DEFAULT_GEO_URL),
        )
        .arg(
            Arg::new(ARG_GEO_TIMEOUT_MS)
                .long(ARG_GEO_TIMEOUT_MS)
                .help("Geolocation lookup timeout in milliseconds")
                .env("TUTORGATE_GEO_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64)),
        )
}
