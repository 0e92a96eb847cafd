//! Hook resources
//!
//! A hook is a stored task definition fired on a schedule, on a message
//! binding, or by hand. Hooks live in named groups; the group id is part of
//! the resource id (`Hook=<group>/<hookId>`), which lets fetch skip whole
//! groups no pattern could match.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalize_description;
use super::resource::FieldValue;

/// A message-queue binding that triggers a hook
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub exchange: String,
    pub routing_key_pattern: String,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.exchange, self.routing_key_pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub hook_group_id: String,
    pub hook_id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub email_on_error: bool,
    pub schedule: Vec<String>,
    pub bindings: Vec<Binding>,
    pub task: serde_json::Value,
    pub trigger_schema: serde_json::Value,
}

impl Hook {
    pub(crate) fn normalized(mut self) -> Self {
        self.description = normalize_description(&self.description);
        self.bindings.sort();
        self
    }

    /// Payload for the hooks service's create/update endpoints.
    /// The name, description, owner and email flag nest under `metadata`.
    pub fn to_api(&self) -> serde_json::Value {
        serde_json::json!({
            "hookGroupId": self.hook_group_id,
            "hookId": self.hook_id,
            "metadata": {
                "name": self.name,
                "description": self.description,
                "owner": self.owner,
                "emailOnError": self.email_on_error,
            },
            "schedule": self.schedule,
            "bindings": self.bindings,
            "task": self.task,
            "triggerSchema": self.trigger_schema,
        })
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("hookGroupId", FieldValue::Text(self.hook_group_id.clone())),
            ("hookId", FieldValue::Text(self.hook_id.clone())),
            ("name", FieldValue::Text(self.name.clone())),
            ("description", FieldValue::Text(self.description.clone())),
            ("owner", FieldValue::Text(self.owner.clone())),
            (
                "emailOnError",
                FieldValue::Text(self.email_on_error.to_string()),
            ),
            ("schedule", FieldValue::List(self.schedule.clone())),
            (
                "bindings",
                FieldValue::List(self.bindings.iter().map(|b| b.to_string()).collect()),
            ),
            ("task", FieldValue::Json(self.task.clone())),
            ("triggerSchema", FieldValue::Json(self.trigger_schema.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hook() -> Hook {
        Hook {
            hook_group_id: "garbage".into(),
            hook_id: "daily".into(),
            name: "daily cleanup".into(),
            description: "cleans up".into(),
            owner: "ops@example.com".into(),
            email_on_error: true,
            schedule: vec!["0 0 4 * * *".into()],
            bindings: vec![
                Binding {
                    exchange: "exchange/b".into(),
                    routing_key_pattern: "#".into(),
                },
                Binding {
                    exchange: "exchange/a".into(),
                    routing_key_pattern: "route.#".into(),
                },
            ],
            task: json!({"payload": {}}),
            trigger_schema: json!({}),
        }
    }

    #[test]
    fn test_normalized_sorts_bindings() {
        let hook = hook().normalized();
        assert_eq!(hook.bindings[0].exchange, "exchange/a");
        assert!(hook.description.starts_with("*DO NOT EDIT*"));
    }

    #[test]
    fn test_to_api_nests_metadata() {
        let api = hook().to_api();
        assert_eq!(api["metadata"]["name"], "daily cleanup");
        assert_eq!(api["metadata"]["emailOnError"], true);
        assert_eq!(api["hookGroupId"], "garbage");
        assert_eq!(api["bindings"][0]["routingKeyPattern"], "#");
    }

    #[test]
    fn test_serde_camel_case() {
        let value = serde_json::to_value(hook()).unwrap();
        assert!(value.get("triggerSchema").is_some());
        assert!(value.get("hookGroupId").is_some());
        assert!(value.get("trigger_schema").is_none());
    }
}
