//! Worker-pool resources
//!
//! A worker pool tells the worker-manager service how to provision workers.
//! Deleting a pool really means assigning `null-provider` and letting the
//! service drain it, so pools in that state are treated as absent on fetch.

use serde::{Deserialize, Serialize};

use super::normalize_description;
use super::resource::FieldValue;

/// Provider assigned to pools being drained prior to deletion
pub const NULL_PROVIDER: &str = "null-provider";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    pub worker_pool_id: String,
    pub description: String,
    pub owner: String,
    pub config: serde_json::Value,
    pub email_on_error: bool,
    pub provider_id: String,
}

impl WorkerPool {
    pub(crate) fn normalized(mut self) -> Self {
        self.description = normalize_description(&self.description);
        self
    }

    /// Payload for the worker-manager service's create/update endpoints
    pub fn to_api(&self) -> serde_json::Value {
        serde_json::json!({
            "description": self.description,
            "owner": self.owner,
            "config": self.config,
            "emailOnError": self.email_on_error,
            "providerId": self.provider_id,
        })
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            (
                "workerPoolId",
                FieldValue::Text(self.worker_pool_id.clone()),
            ),
            ("description", FieldValue::Text(self.description.clone())),
            ("owner", FieldValue::Text(self.owner.clone())),
            ("config", FieldValue::Json(self.config.clone())),
            (
                "emailOnError",
                FieldValue::Text(self.email_on_error.to_string()),
            ),
            ("providerId", FieldValue::Text(self.provider_id.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool() -> WorkerPool {
        WorkerPool {
            worker_pool_id: "proj-deck/ci".into(),
            description: "ci workers".into(),
            owner: "ops@example.com".into(),
            config: json!({"minCapacity": 0, "maxCapacity": 20}),
            email_on_error: false,
            provider_id: "cloud-a".into(),
        }
    }

    #[test]
    fn test_to_api_excludes_pool_id() {
        let api = pool().to_api();
        assert!(api.get("workerPoolId").is_none());
        assert_eq!(api["providerId"], "cloud-a");
        assert_eq!(api["config"]["maxCapacity"], 20);
    }

    #[test]
    fn test_deserializes_from_api_result() {
        let pool: WorkerPool = serde_json::from_value(json!({
            "workerPoolId": "proj-deck/ci",
            "description": "d",
            "owner": "o@example.com",
            "config": {},
            "emailOnError": false,
            "providerId": "cloud-a",
            "created": "2026-01-01T00:00:00.000Z",
            "currentCapacity": 3,
        }))
        .unwrap();
        assert_eq!(pool.worker_pool_id, "proj-deck/ci");
    }
}
