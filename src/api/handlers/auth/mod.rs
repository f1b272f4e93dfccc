//! Authentication endpoints: access-key login, the OAuth redirect pair, logout
//! and session status.

pub mod login;
pub mod oauth;
pub mod principal;
pub mod session;
pub mod types;
pub(crate) mod utils;

pub use principal::require_session;
pub use session::SESSION_COOKIE_NAME;

#[cfg(test)]
mod tests;
