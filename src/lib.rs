//! # Tutorgate (Authentication Gateway & Audit Trail)
//!
//! `tutorgate` fronts an interactive tutoring application with two login paths
//! and a shared session layer, and records every access decision in an
//! append-only audit trail.
//!
//! ## Login Paths
//!
//! - **Access keys:** usernames and SHA-256 key digests are configured as two
//!   parallel JSON arrays (`USERS`, `ACCESS_KEYS`). The client hashes the key
//!   before sending it, so plaintext never crosses the wire. A configuration
//!   defect (mismatched lengths, malformed JSON) makes the path fail closed.
//! - **Google OAuth:** authorization-code flow with a single-use `state` token
//!   per attempt. Replayed, expired or unknown states are rejected before the
//!   provider is contacted.
//!
//! Both paths mint opaque, 256-bit session tokens held in memory. Only a
//! SHA-256 hash of a token is used as the lookup key.
//!
//! ## Audit Streams
//!
//! Two line-oriented files under the log directory:
//!
//! - `access.log`: `TIMESTAMP - IP: <ip> | Location: <location> | Event: <EVENT> | Details: <details>`
//! - `app.log`: `TIMESTAMP - LEVEL - MESSAGE | Details: <details>`
//!
//! Locations come from a best-effort geo lookup that never blocks the login
//! path for longer than its timeout. Writers are serialised per file, so
//! concurrent requests never produce torn lines. The `logview` binary reads
//! both files without modifying them.

pub mod api;
pub mod audit;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod geo;
pub mod oauth;
pub mod query;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
