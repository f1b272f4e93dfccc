//! Audit events and their fixed on-disk line formats.
//!
//! Two streams exist: the access stream records authentication decisions with
//! the client's IP and coarse location, the application stream records
//! whatever the wrapped application reports. Line formats are consumed by
//! external tooling (and by [`crate::query`]) and must not change:
//!
//! ```text
//! 2025-01-15 10:23:45 - IP: 203.0.113.7 | Location: Berlin, Land Berlin, Germany | Event: AUTH_SUCCESS | Details: User authenticated: admin
//! 2025-01-15 10:23:46 - INFO - Code execution started | Details: exercise=3
//! ```

mod recorder;
mod writer;

pub use recorder::AccessRecorder;
pub use writer::{AuditLogger, sanitize_username};

use chrono::{DateTime, Local};
use std::fmt;
use std::str::FromStr;

/// Upper bound for the `details` field, in characters.
pub const MAX_DETAILS_CHARS: usize = 512;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Access,
    App,
}

impl Stream {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Access => "access.log",
            Self::App => "app.log",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    AuthSuccess,
    AuthFailed,
    AuthError,
    Logout,
    AppStart,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthSuccess => "AUTH_SUCCESS",
            Self::AuthFailed => "AUTH_FAILED",
            Self::AuthError => "AUTH_ERROR",
            Self::Logout => "LOGOUT",
            Self::AppStart => "APP_START",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "AUTH_SUCCESS" => Ok(Self::AuthSuccess),
            "AUTH_FAILED" => Ok(Self::AuthFailed),
            "AUTH_ERROR" => Ok(Self::AuthError),
            "LOGOUT" => Ok(Self::Logout),
            "APP_START" => Ok(Self::AppStart),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AppLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl AppLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for AppLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One access-stream record.
#[derive(Clone, Debug)]
pub struct AuditEvent {
    pub timestamp: DateTime<Local>,
    pub ip: String,
    pub location: String,
    pub event_type: EventType,
    pub details: String,
}

impl AuditEvent {
    #[must_use]
    pub fn new(ip: &str, location: &str, event_type: EventType, details: &str) -> Self {
        Self {
            timestamp: Local::now(),
            ip: single_line(ip),
            location: single_line(location),
            event_type,
            details: bound_details(details),
        }
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{} - IP: {} | Location: {} | Event: {} | Details: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.ip,
            self.location,
            self.event_type,
            self.details
        )
    }
}

/// One application-stream record.
///
/// When `username` is set the event lands in that user's own stream
/// (`app_<username>.log`) instead of `app.log`.
#[derive(Clone, Debug)]
pub struct AppEvent {
    pub timestamp: DateTime<Local>,
    pub level: AppLevel,
    pub message: String,
    pub details: Option<String>,
    pub username: Option<String>,
}

impl AppEvent {
    #[must_use]
    pub fn new(level: AppLevel, message: &str) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: single_line(message),
            details: None,
            username: None,
        }
    }

    #[must_use]
    pub fn info(message: &str) -> Self {
        Self::new(AppLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: &str) -> Self {
        Self::new(AppLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: &str) -> Self {
        Self::new(AppLevel::Error, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(bound_details(details));
        self
    }

    #[must_use]
    pub fn for_user(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT);
        match &self.details {
            Some(details) => format!(
                "{timestamp} - {} - {} | Details: {details}",
                self.level, self.message
            ),
            None => format!("{timestamp} - {} - {}", self.level, self.message),
        }
    }
}

/// Anything the [`AuditLogger`] can persist.
#[derive(Clone, Debug)]
pub enum LogEntry {
    Access(AuditEvent),
    App(AppEvent),
}

impl LogEntry {
    #[must_use]
    pub fn stream(&self) -> Stream {
        match self {
            Self::Access(_) => Stream::Access,
            Self::App(_) => Stream::App,
        }
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::Access(event) => event.to_line(),
            Self::App(event) => event.to_line(),
        }
    }
}

impl From<AuditEvent> for LogEntry {
    fn from(event: AuditEvent) -> Self {
        Self::Access(event)
    }
}

impl From<AppEvent> for LogEntry {
    fn from(event: AppEvent) -> Self {
        Self::App(event)
    }
}

/// Collapse control characters so one event is always one line, and replace
/// the `|` field separator so free text cannot open a new field.
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '|' => '/',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

fn bound_details(details: &str) -> String {
    let flat = single_line(details);
    if flat.chars().count() <= MAX_DETAILS_CHARS {
        return flat;
    }
    let mut truncated: String = flat.chars().take(MAX_DETAILS_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 1, 15, 10, 23, 45)
            .single()
            .unwrap_or_else(Local::now)
    }

    #[test]
    fn access_line_matches_fixed_format() {
        let mut event = AuditEvent::new(
            "203.0.113.7",
            "Berlin, Germany",
            EventType::AuthSuccess,
            "User authenticated: admin",
        );
        event.timestamp = fixed_time();
        assert_eq!(
            event.to_line(),
            "2025-01-15 10:23:45 - IP: 203.0.113.7 | Location: Berlin, Germany | Event: AUTH_SUCCESS | Details: User authenticated: admin"
        );
    }

    #[test]
    fn app_line_omits_missing_details() {
        let mut event = AppEvent::info("tutorgate starting");
        event.timestamp = fixed_time();
        assert_eq!(event.to_line(), "2025-01-15 10:23:45 - INFO - tutorgate starting");

        let mut event = AppEvent::warning("Streaming failed").with_details("fallback=sync");
        event.timestamp = fixed_time();
        assert_eq!(
            event.to_line(),
            "2025-01-15 10:23:45 - WARNING - Streaming failed | Details: fallback=sync"
        );
    }

    #[test]
    fn details_are_flattened_and_truncated() {
        let event = AuditEvent::new("ip", "loc", EventType::AuthFailed, "line one\nline two\r");
        assert_eq!(event.details, "line one line two ");

        let long = "x".repeat(MAX_DETAILS_CHARS + 40);
        let event = AuditEvent::new("ip", "loc", EventType::AuthFailed, &long);
        assert_eq!(event.details.chars().count(), MAX_DETAILS_CHARS + 3);
        assert!(event.details.ends_with("..."));
    }

    #[test]
    fn field_separators_cannot_be_injected() {
        let mut event = AuditEvent::new(
            "6.6.6.6 | Location: X | Event: AUTH_SUCCESS | Details: admin",
            "Nowhere | Event: LOGOUT",
            EventType::AuthFailed,
            "Invalid credentials for user: mallory | Event: AUTH_SUCCESS",
        );
        event.timestamp = fixed_time();
        let line = event.to_line();
        assert_eq!(line.matches(" | ").count(), 3);
        assert_eq!(line.matches("Event: ").count(), 4);
        assert!(line.contains("| Event: AUTH_FAILED | Details: "));

        let app = AppEvent::error("a | b").with_details("c | d");
        assert!(!app.message.contains('|'));
        assert_eq!(app.details.as_deref(), Some("c / d"));
    }

    #[test]
    fn event_type_round_trips_through_str() {
        for event in [
            EventType::AuthSuccess,
            EventType::AuthFailed,
            EventType::AuthError,
            EventType::Logout,
            EventType::AppStart,
        ] {
            assert_eq!(event.as_str().parse::<EventType>(), Ok(event));
        }
        assert!("NOPE".parse::<EventType>().is_err());
    }

    #[test]
    fn log_entry_routes_to_stream() {
        let access: LogEntry = AuditEvent::new("ip", "loc", EventType::Logout, "").into();
        let app: LogEntry = AppEvent::info("hi").into();
        assert_eq!(access.stream(), Stream::Access);
        assert_eq!(app.stream(), Stream::App);
        assert_eq!(Stream::Access.file_name(), "access.log");
    }
}
