//! Secret string type for safe credential handling.
//!
//! Access tokens pass through configuration loading, Debug-formatted
//! structs and error chains; this wrapper makes sure none of those paths
//! can print the value.

use serde::Deserialize;
use std::fmt;

/// A wrapper for credentials that prevents accidental logging.
///
/// `Debug` and `Display` print `[REDACTED]`; reading the value requires an
/// explicit `expose_secret()` call at the site that puts it on the wire.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret from any string-like value.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Explicitly expose the secret value.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // Best-effort memory clearing; the compiler may elide it and copies
        // may exist elsewhere. Good enough for keeping tokens out of casual
        // core dumps, not a security boundary.
        self.0.clear();
        self.0.shrink_to_fit();
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}
