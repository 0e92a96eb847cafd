//! Policy checks over the generated set
//!
//! Runs offline against the desired state, before anything touches the
//! cluster. Two things are verified for every declared role:
//!
//! - assuming it expands to a fixed point within the round cap, so the
//!   role graph the configuration describes is one the auth service can
//!   actually evaluate;
//! - the expansion does not reach the universal scope `*` unless some role
//!   literally grants `*`. Star substitution can widen grants in
//!   non-obvious ways (see `scopes`), and full cluster control minted by
//!   accident is the worst case of that.

use tracing::instrument;

use crate::resources::{Resource, ResourceSet};
use crate::scopes::{satisfies, ScopeResolver};

/// One policy violation found in the generated set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub role_id: String,
    pub message: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Role={}: {}", self.role_id, self.message)
    }
}

/// Check the authorization closure of every role in `resources`.
///
/// Returns every violation rather than stopping at the first, so one run
/// shows the whole cleanup.
#[instrument(skip(resources), fields(resources = resources.len()))]
pub fn check_roles(resources: &ResourceSet) -> Vec<Finding> {
    let resolver = ScopeResolver::from_resources(resources);

    let star_granted_literally = resources.iter().any(|resource| match resource {
        Resource::Role(role) => role.scopes.iter().any(|scope| scope == "*"),
        _ => false,
    });

    let mut findings = Vec::new();
    for resource in resources.iter() {
        let Resource::Role(role) = resource else {
            continue;
        };

        let assume = vec![format!("assume:{}", role.role_id)];
        let expanded = match resolver.expand_scopes(&assume) {
            Ok(expanded) => expanded,
            Err(e) => {
                findings.push(Finding {
                    role_id: role.role_id.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        if !star_granted_literally && satisfies(&expanded, &[String::from("*")]) {
            findings.push(Finding {
                role_id: role.role_id.clone(),
                message: format!(
                    "expands to the universal scope `*`, but no role grants `*` literally \
                     (closure: {})",
                    expanded.join(", ")
                ),
            });
        }
    }
    findings
}
