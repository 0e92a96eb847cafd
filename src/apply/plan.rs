//! Change planning
//!
//! Compares the desired set against the live set id by id and produces the
//! edit script: one `Change` per id that differs. Ids present on both
//! sides with equal values produce nothing. The script is ordered by id,
//! so the same pair of sets always yields the same plan.

use std::collections::BTreeSet;
use std::fmt;

use crate::resources::{Resource, ResourceSet};

/// The three mutating verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    pub fn verb(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// One planned mutation.
///
/// Updates carry both sides so the diff renderer can show what changed;
/// the apply path only sends the desired side.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create { resource: Resource },
    Update { current: Resource, generated: Resource },
    Delete { resource: Resource },
}

impl Change {
    pub fn action(&self) -> Action {
        match self {
            Change::Create { .. } => Action::Create,
            Change::Update { .. } => Action::Update,
            Change::Delete { .. } => Action::Delete,
        }
    }

    /// The resource the remote should end up reflecting: the desired side
    /// for create and update, the live side for delete.
    pub fn resource(&self) -> &Resource {
        match self {
            Change::Create { resource } => resource,
            Change::Update { generated, .. } => generated,
            Change::Delete { resource } => resource,
        }
    }

    pub fn id(&self) -> String {
        self.resource().id()
    }
}

/// Compute the edit script converging `current` to `generated`
pub fn plan(generated: &ResourceSet, current: &ResourceSet) -> Vec<Change> {
    let mut ids: BTreeSet<&str> = generated.ids().collect();
    ids.extend(current.ids());

    let mut changes = Vec::new();
    for id in ids {
        match (generated.get(id), current.get(id)) {
            (Some(g), Some(c)) => {
                if g != c {
                    changes.push(Change::Update {
                        current: c.clone(),
                        generated: g.clone(),
                    });
                }
            }
            (Some(g), None) => changes.push(Change::Create {
                resource: g.clone(),
            }),
            (None, Some(c)) => changes.push(Change::Delete {
                resource: c.clone(),
            }),
            (None, None) => continue,
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Role;

    fn set(roles: &[(&str, &[&str])]) -> ResourceSet {
        let mut set = ResourceSet::new();
        set.manage("Role=*").unwrap();
        for (id, scopes) in roles {
            set.add(Resource::Role(Role::new(
                *id,
                "test",
                scopes.iter().map(|s| s.to_string()).collect(),
            )))
            .unwrap();
        }
        set
    }

    #[test]
    fn test_equal_sets_plan_nothing() {
        let a = set(&[("r1", &["a"]), ("r2", &["b"])]);
        let b = set(&[("r1", &["a"]), ("r2", &["b"])]);
        assert!(plan(&a, &b).is_empty());
    }

    #[test]
    fn test_classification() {
        let generated = set(&[("created", &[]), ("changed", &["new"]), ("same", &["x"])]);
        let current = set(&[("deleted", &[]), ("changed", &["old"]), ("same", &["x"])]);

        let changes = plan(&generated, &current);
        // sorted by id: changed, created, deleted
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].action(), Action::Update);
        assert_eq!(changes[0].id(), "Role=changed");
        assert_eq!(changes[1].action(), Action::Create);
        assert_eq!(changes[1].id(), "Role=created");
        assert_eq!(changes[2].action(), Action::Delete);
        assert_eq!(changes[2].id(), "Role=deleted");
    }

    #[test]
    fn test_update_carries_both_sides() {
        let generated = set(&[("r", &["new"])]);
        let current = set(&[("r", &["old"])]);

        match &plan(&generated, &current)[0] {
            Change::Update { current, generated } => {
                match (current, generated) {
                    (Resource::Role(c), Resource::Role(g)) => {
                        assert_eq!(c.scopes, vec!["old"]);
                        assert_eq!(g.scopes, vec!["new"]);
                    }
                    _ => panic!("expected roles"),
                }
            }
            other => panic!("expected update, got {:?}", other.action()),
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let generated = set(&[("b", &[]), ("a", &[]), ("c", &[])]);
        let current = set(&[]);
        let ids: Vec<String> = plan(&generated, &current).iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["Role=a", "Role=b", "Role=c"]);
    }
}
