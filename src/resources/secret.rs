//! Secret resources
//!
//! A secret's value is sensitive, so it never appears in serialized
//! documents or display output. The display form is a salted SHA-256
//! fingerprint: salted freshly each run, so fingerprints are comparable
//! within a run (change detection works) but useless across runs or logs.
//!
//! A `value` of `None` means the value was not fetched, not that the secret
//! is empty. Valueless secrets compare equal by name alone and cannot be
//! written to the remote.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ResourceError, ResourceResult};

use super::resource::FieldValue;
use super::EXPIRES_FOREVER;

static PER_RUN_SALT: OnceLock<u128> = OnceLock::new();

fn per_run_salt() -> u128 {
    *PER_RUN_SALT.get_or_init(rand::random)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub name: String,
    /// Never serialized; `None` when the value was not fetched
    #[serde(skip)]
    pub value: Option<serde_json::Value>,
}

impl Secret {
    /// A secret known by name only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// A secret with a known value
    pub fn with_value(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Payload for the secrets service's set endpoint
    pub fn to_api(&self) -> ResourceResult<serde_json::Value> {
        let value = self.value.as_ref().ok_or_else(|| {
            ResourceError::Invalid(format!("Secret={} has no value to write", self.name))
        })?;
        Ok(serde_json::json!({
            "expires": EXPIRES_FOREVER,
            "secret": value,
        }))
    }

    /// Salted fingerprint of the value, or `<unknown>` when not fetched
    pub fn fingerprint(&self) -> String {
        match &self.value {
            None => "<unknown>".to_string(),
            Some(value) => {
                let mut hasher = Sha256::new();
                hasher.update(per_run_salt().to_be_bytes());
                hasher.update(self.name.as_bytes());
                // object keys serialize sorted, so equal values hash equal
                hasher.update(value.to_string().as_bytes());
                let digest = hasher.finalize();
                let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
                hex[..10].to_string()
            }
        }
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", FieldValue::Text(self.name.clone())),
            ("value", FieldValue::Text(self.fingerprint())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_never_serializes() {
        let secret = Secret::with_value("project/deploy", json!({"token": "hunter2"}));
        let serialized = serde_json::to_string(&secret).unwrap();
        assert!(!serialized.contains("hunter2"));
        assert!(serialized.contains("project/deploy"));
    }

    #[test]
    fn test_fingerprint_tracks_value() {
        let a = Secret::with_value("s", json!({"k": "v1"}));
        let b = Secret::with_value("s", json!({"k": "v1"}));
        let c = Secret::with_value("s", json!({"k": "v2"}));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_does_not_reveal_value() {
        let secret = Secret::with_value("s", json!("hunter2"));
        let fp = secret.fingerprint();
        assert_eq!(fp.len(), 10);
        assert!(!fp.contains("hunter2"));
    }

    #[test]
    fn test_unknown_fingerprint() {
        assert_eq!(Secret::new("s").fingerprint(), "<unknown>");
    }

    #[test]
    fn test_to_api_requires_value() {
        assert!(Secret::new("s").to_api().is_err());
        let api = Secret::with_value("s", json!({"k": 1})).to_api().unwrap();
        assert_eq!(api["expires"], EXPIRES_FOREVER);
        assert_eq!(api["secret"], json!({"k": 1}));
    }
}
