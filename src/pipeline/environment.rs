//! Named environments
//!
//! A deployment usually has more than one cluster (production, staging)
//! sharing one declared configuration. An `Environment` pins the root URL
//! it expects, so a run configured for staging can never mutate production
//! by accident, and names the modifiers to apply after generation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::resources::{Resource, ResourceSet};

use super::{Modifier, Pipeline};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Environment {
    /// Root URL this environment's cluster lives at
    pub root_url: String,

    /// Names of modifiers to apply after generation, in order
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl Environment {
    /// Refuse to proceed when the active configuration points at a
    /// different cluster than this environment expects.
    pub fn verify_root_url(&self, name: &str, active: &str) -> Result<()> {
        if self.root_url.trim_end_matches('/') != active.trim_end_matches('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "environment {} expects root URL {}, but the active configuration points at {}",
                    name, self.root_url, active
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Register this environment's modifiers, in declaration order
    pub fn register_modifiers(&self, pipeline: &mut Pipeline) -> Result<()> {
        for name in &self.modifiers {
            match name.as_str() {
                "remove_hook_schedules" => pipeline.register_modifier(RemoveHookSchedules),
                "remove_hook_bindings" => pipeline.register_modifier(RemoveHookBindings),
                other => {
                    return Err(ConfigError::Invalid {
                        message: format!("no modifier named {}", other),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Strip schedules from every hook so none of them fire
pub struct RemoveHookSchedules;

#[async_trait]
impl Modifier for RemoveHookSchedules {
    async fn modify(&self, resources: ResourceSet) -> Result<ResourceSet> {
        Ok(resources.map(|resource| match resource {
            Resource::Hook(mut hook) if !hook.schedule.is_empty() => {
                hook.schedule.clear();
                Resource::Hook(hook)
            }
            other => other,
        })?)
    }
}

/// Strip bindings from every hook, for clusters whose exchanges do not
/// exist
pub struct RemoveHookBindings;

#[async_trait]
impl Modifier for RemoveHookBindings {
    async fn modify(&self, resources: ResourceSet) -> Result<ResourceSet> {
        Ok(resources.map(|resource| match resource {
            Resource::Hook(mut hook) if !hook.bindings.is_empty() => {
                hook.bindings.clear();
                Resource::Hook(hook)
            }
            other => other,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Binding, Hook};
    use serde_json::json;

    fn hook_with_schedule() -> Resource {
        Resource::Hook(Hook {
            hook_group_id: "group".into(),
            hook_id: "nightly".into(),
            name: "nightly".into(),
            description: "runs nightly".into(),
            owner: "ops@example.com".into(),
            email_on_error: false,
            schedule: vec!["0 0 4 * * *".into()],
            bindings: vec![Binding {
                exchange: "exchange/pulse/build".into(),
                routing_key_pattern: "#".into(),
            }],
            task: json!({}),
            trigger_schema: json!({}),
        })
    }

    fn set_with_hook() -> ResourceSet {
        let mut set = ResourceSet::new();
        set.manage("Hook=group/*").unwrap();
        set.add(hook_with_schedule()).unwrap();
        set
    }

    #[tokio::test]
    async fn test_remove_hook_schedules() {
        let modified = RemoveHookSchedules.modify(set_with_hook()).await.unwrap();
        match modified.get("Hook=group/nightly").unwrap() {
            Resource::Hook(h) => {
                assert!(h.schedule.is_empty());
                assert_eq!(h.bindings.len(), 1);
            }
            other => panic!("unexpected kind: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_remove_hook_bindings() {
        let modified = RemoveHookBindings.modify(set_with_hook()).await.unwrap();
        match modified.get("Hook=group/nightly").unwrap() {
            Resource::Hook(h) => {
                assert!(h.bindings.is_empty());
                assert_eq!(h.schedule.len(), 1);
            }
            other => panic!("unexpected kind: {}", other.kind()),
        }
    }

    #[test]
    fn test_verify_root_url() {
        let env = Environment {
            root_url: "https://staging.example.com".into(),
            modifiers: vec![],
        };
        assert!(
            env.verify_root_url("staging", "https://staging.example.com/")
                .is_ok()
        );
        assert!(
            env.verify_root_url("staging", "https://prod.example.com")
                .is_err()
        );
    }

    #[test]
    fn test_register_unknown_modifier() {
        let env = Environment {
            root_url: "https://x".into(),
            modifiers: vec!["no_such_modifier".into()],
        };
        let mut pipeline = Pipeline::new();
        assert!(env.register_modifiers(&mut pipeline).is_err());
    }

    #[test]
    fn test_deserialize() {
        let env: Environment = serde_json::from_value(json!({
            "root_url": "https://ci.example.com",
            "modifiers": ["remove_hook_schedules"]
        }))
        .unwrap();
        assert_eq!(env.modifiers, vec!["remove_hook_schedules"]);
    }
}
