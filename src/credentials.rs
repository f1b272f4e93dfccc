//! Static access-key credential store.
//!
//! The configured `USERS` and `ACCESS_KEYS` arrays are matched by position.
//! They are folded into a single list of [`Credential`] records at load time,
//! so nothing downstream ever indexes two arrays in parallel. The store is
//! immutable after construction; reloading requires a restart.

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub hashed_key: String,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct CredentialStore {
    credentials: Vec<Credential>,
}

/// A SHA-256 digest rendered as 64 hex characters.
#[must_use]
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

impl CredentialStore {
    /// Build the store from already-decoded lists.
    ///
    /// # Errors
    /// Returns `ConfigError` when the lists differ in length, are empty, or an
    /// entry is not a non-empty username / 64-character hex digest.
    pub fn load(usernames: Vec<String>, hashed_keys: Vec<String>) -> Result<Self, ConfigError> {
        if usernames.len() != hashed_keys.len() {
            return Err(ConfigError::LengthMismatch {
                users: usernames.len(),
                keys: hashed_keys.len(),
            });
        }
        if usernames.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut credentials = Vec::with_capacity(usernames.len());
        for (index, (username, hashed_key)) in usernames.into_iter().zip(hashed_keys).enumerate() {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(ConfigError::InvalidEntry {
                    index,
                    reason: "empty username".to_string(),
                });
            }
            let hashed_key = hashed_key.trim();
            if !is_sha256_hex(hashed_key) {
                return Err(ConfigError::InvalidEntry {
                    index,
                    reason: "access key is not a SHA-256 hex digest".to_string(),
                });
            }
            credentials.push(Credential {
                username,
                hashed_key: hashed_key.to_ascii_lowercase(),
                index,
            });
        }

        Ok(Self { credentials })
    }

    /// Parse the raw `USERS` / `ACCESS_KEYS` JSON arrays.
    ///
    /// # Errors
    /// Returns `ConfigError::MalformedJson` when either value is not a JSON
    /// array of strings, otherwise whatever [`CredentialStore::load`] returns.
    pub fn from_json(users_json: &str, keys_json: &str) -> Result<Self, ConfigError> {
        let usernames: Vec<String> =
            serde_json::from_str(users_json).map_err(|err| ConfigError::MalformedJson {
                field: "USERS",
                reason: err.to_string(),
            })?;
        let hashed_keys: Vec<String> =
            serde_json::from_str(keys_json).map_err(|err| ConfigError::MalformedJson {
                field: "ACCESS_KEYS",
                reason: err.to_string(),
            })?;
        Self::load(usernames, hashed_keys)
    }

    /// Check a client-supplied digest against the first credential with a
    /// matching username.
    #[must_use]
    pub fn verify(&self, username: &str, supplied_hash: &str) -> bool {
        let supplied = supplied_hash.trim().to_ascii_lowercase();
        self.credentials
            .iter()
            .find(|credential| credential.username == username)
            .is_some_and(|credential| credential.hashed_key == supplied)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn digest(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    #[test]
    fn load_pairs_by_index() {
        let store = CredentialStore::load(
            vec!["alice".to_string(), "bob".to_string()],
            vec![digest("a"), digest("b")],
        );
        assert!(store.is_ok());
        if let Ok(store) = store {
            let records: Vec<_> = store.credentials().collect();
            assert_eq!(records.len(), 2);
            assert_eq!(records[1].username, "bob");
            assert_eq!(records[1].index, 1);
            assert_eq!(records[1].hashed_key, digest("b"));
        }
    }

    #[test]
    fn load_rejects_length_mismatch() {
        let result = CredentialStore::load(
            vec!["a".to_string(), "b".to_string()],
            vec![digest("x")],
        );
        assert_eq!(
            result.err(),
            Some(ConfigError::LengthMismatch { users: 2, keys: 1 })
        );
    }

    #[test]
    fn load_rejects_empty_lists() {
        assert_eq!(
            CredentialStore::load(Vec::new(), Vec::new()).err(),
            Some(ConfigError::Empty)
        );
    }

    #[test]
    fn load_rejects_invalid_digest() {
        let result = CredentialStore::load(vec!["a".to_string()], vec!["x".to_string()]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEntry { index: 0, .. })
        ));
    }

    #[test]
    fn load_rejects_blank_username() {
        let result = CredentialStore::load(vec!["  ".to_string()], vec![digest("x")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEntry { index: 0, .. })
        ));
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        let result = CredentialStore::from_json("[\"admin\"", "[]");
        assert!(matches!(
            result,
            Err(ConfigError::MalformedJson { field: "USERS", .. })
        ));
        let result = CredentialStore::from_json("[\"admin\"]", "{}");
        assert!(matches!(
            result,
            Err(ConfigError::MalformedJson {
                field: "ACCESS_KEYS",
                ..
            })
        ));
    }

    #[test]
    fn verify_matches_stored_digest() {
        let users = serde_json::json!(["admin"]).to_string();
        let keys = serde_json::json!([digest("hello")]).to_string();
        let store = CredentialStore::from_json(&users, &keys);
        assert!(store.is_ok());
        if let Ok(store) = store {
            assert!(store.verify("admin", &digest("hello")));
            assert!(store.verify("admin", &digest("hello").to_uppercase()));
            assert!(!store.verify("admin", &digest("wrong")));
            assert!(!store.verify("nobody", &digest("hello")));
        }
    }

    #[test]
    fn verify_uses_first_matching_username() {
        let store = CredentialStore::load(
            vec!["dup".to_string(), "dup".to_string()],
            vec![digest("first"), digest("second")],
        );
        assert!(store.is_ok());
        if let Ok(store) = store {
            assert!(store.verify("dup", &digest("first")));
            assert!(!store.verify("dup", &digest("second")));
        }
    }

    #[test]
    fn is_sha256_hex_checks_shape() {
        assert!(is_sha256_hex(&digest("x")));
        assert!(!is_sha256_hex("abc"));
        assert!(!is_sha256_hex(&"g".repeat(64)));
        assert!(!is_sha256_hex(&"é".repeat(32)));
        assert!(is_sha256_hex(&digest("x").to_uppercase()));
    }
}
