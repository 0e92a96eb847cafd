//! The `Resource` enum
//!
//! A closed union over the five managed kinds. The set of kinds is part of
//! the reconciler's contract with the remote service, so an enum (rather
//! than some open registry) is the honest shape: adding a kind means
//! touching the fetchers and the apply dispatch anyway, and the compiler
//! points at every site.

use std::fmt;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};

use super::{Client, Hook, Role, Secret, WorkerPool};

/// One managed resource of any kind.
///
/// Serializes with an adjacent `kind` tag, so documents read
/// `{"kind": "Role", "roleId": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Role(Role),
    Client(Client),
    Hook(Hook),
    WorkerPool(WorkerPool),
    Secret(Secret),
}

impl Resource {
    /// Every kind name, for callers that filter by kind
    pub const KINDS: [&'static str; 5] = ["Role", "Client", "Hook", "WorkerPool", "Secret"];

    /// The kind name, as used in ids and serialized documents
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Role(_) => "Role",
            Resource::Client(_) => "Client",
            Resource::Hook(_) => "Hook",
            Resource::WorkerPool(_) => "WorkerPool",
            Resource::Secret(_) => "Secret",
        }
    }

    /// The kind-qualified id
    pub fn id(&self) -> String {
        match self {
            Resource::Role(r) => format!("Role={}", r.role_id),
            Resource::Client(c) => format!("Client={}", c.client_id),
            Resource::Hook(h) => format!("Hook={}/{}", h.hook_group_id, h.hook_id),
            Resource::WorkerPool(w) => format!("WorkerPool={}", w.worker_pool_id),
            Resource::Secret(s) => format!("Secret={}", s.name),
        }
    }

    /// Return the canonical form: banner on the description, scope lists
    /// sorted and deduplicated, bindings sorted. Idempotent.
    pub fn normalized(self) -> Self {
        match self {
            Resource::Role(r) => Resource::Role(r.normalized()),
            Resource::Client(c) => Resource::Client(c.normalized()),
            Resource::Hook(h) => Resource::Hook(h.normalized()),
            Resource::WorkerPool(w) => Resource::WorkerPool(w.normalized()),
            Resource::Secret(s) => Resource::Secret(s),
        }
    }

    /// Merge two resources with the same id.
    ///
    /// Roles and clients merge by unioning scopes (descriptions must be
    /// identical); every other kind refuses, which surfaces as a duplicate
    /// definition to the caller.
    pub fn merge(&self, other: &Resource) -> ResourceResult<Resource> {
        match (self, other) {
            (Resource::Role(a), Resource::Role(b)) => Ok(Resource::Role(a.merge(b)?)),
            (Resource::Client(a), Resource::Client(b)) => Ok(Resource::Client(a.merge(b)?)),
            _ => Err(ResourceError::Duplicate {
                id: self.id(),
                kind: self.kind(),
            }),
        }
    }

    /// Field names and display values, in declaration order.
    ///
    /// This is the single source for the textual rendering below and for
    /// the per-field diff, so the two always agree on what a "field" is.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            Resource::Role(r) => r.fields(),
            Resource::Client(c) => c.fields(),
            Resource::Hook(h) => h.fields(),
            Resource::WorkerPool(w) => w.fields(),
            Resource::Secret(s) => s.fields(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.id().underline())?;
        let fields = self.fields();
        let mut first = true;
        for (name, value) in fields {
            if !first {
                writeln!(f)?;
            }
            first = false;
            let label = format!("  {}:", name.bold());
            let rendered = value.render();
            if rendered.contains('\n') {
                write!(f, "{}\n{}", label, indent(&rendered, "    "))?;
            } else {
                write!(f, "{} {}", label, rendered)?;
            }
        }
        Ok(())
    }
}

/// A resource field rendered for display and diffing
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar display text
    Text(String),
    /// Bulleted in text output; diffed element-wise
    List(Vec<String>),
    /// Pretty-printed in text output; diffed line-wise
    Json(serde_json::Value),
}

impl FieldValue {
    /// Render for text output (without the field label)
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
            FieldValue::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

pub(crate) fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::DESCRIPTION_PREFIX;

    fn role() -> Resource {
        Resource::Role(Role::new(
            "proj-deck/admin",
            "Admin role",
            vec!["queue:*".into(), "auth:create-role:*".into()],
        ))
    }

    #[test]
    fn test_kind_and_id() {
        let r = role();
        assert_eq!(r.kind(), "Role");
        assert_eq!(r.id(), "Role=proj-deck/admin");

        let h = Resource::Hook(Hook {
            hook_group_id: "proj-deck".into(),
            hook_id: "nightly".into(),
            name: "nightly".into(),
            description: "d".into(),
            owner: "deck@example.com".into(),
            email_on_error: false,
            schedule: vec![],
            bindings: vec![],
            task: serde_json::json!({}),
            trigger_schema: serde_json::json!({}),
        });
        assert_eq!(h.id(), "Hook=proj-deck/nightly");
    }

    #[test]
    fn test_serde_kind_tag() {
        let json = serde_json::to_value(role()).unwrap();
        assert_eq!(json["kind"], "Role");
        assert_eq!(json["roleId"], "proj-deck/admin");

        let back: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(back, role());
    }

    #[test]
    fn test_merge_roles_unions_scopes() {
        let a = Resource::Role(Role::new("r", "shared", vec!["scope:a".into()]));
        let b = Resource::Role(Role::new("r", "shared", vec!["scope:b".into()]));
        let merged = a.merge(&b).unwrap();
        match merged {
            Resource::Role(r) => {
                assert_eq!(r.scopes, vec!["scope:a".to_string(), "scope:b".to_string()]);
            }
            other => panic!("unexpected kind: {}", other.kind()),
        }
    }

    #[test]
    fn test_merge_description_mismatch() {
        let a = Resource::Role(Role::new("r", "one", vec![]));
        let b = Resource::Role(Role::new("r", "two", vec![]));
        assert!(matches!(
            a.merge(&b),
            Err(ResourceError::MergeConflict {
                field: "description",
                ..
            })
        ));
    }

    #[test]
    fn test_secrets_do_not_merge() {
        let a = Resource::Secret(Secret::with_value("s", serde_json::json!({"k": 1})));
        let b = Resource::Secret(Secret::with_value("s", serde_json::json!({"k": 1})));
        assert!(matches!(
            a.merge(&b),
            Err(ResourceError::Duplicate { kind: "Secret", .. })
        ));
    }

    #[test]
    fn test_display_contains_fields() {
        colored::control::set_override(false);
        let text = role().to_string();
        assert!(text.starts_with("Role=proj-deck/admin:"));
        assert!(text.contains("description:"));
        assert!(text.contains("- queue:*"));
        assert!(text.contains(DESCRIPTION_PREFIX.trim_end()));
        colored::control::unset_override();
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", "  "), "  a\n\n  b");
    }
}
