//! Scope expansion
//!
//! Emulates the expansion the cluster's auth service performs when something
//! assumes a role, so `check` can reason about the authorization graph
//! without a network round trip. The emulation matches the service's rules
//! exactly (not its algorithm; this one is simple and potentially slow).
//!
//! ## Rules
//!
//! Expanding a scope set repeatedly applies, until nothing new appears:
//!
//! - a scope `assume:<roleId>` adds that role's scopes;
//! - a role id ending in `*` is assumed by any `assume:` scope with the
//!   stem as prefix; the text matched by the star substitutes into `<..>`
//!   placeholders in the role's scopes;
//! - a scope ending in `*` assumes every role whose `assume:` form starts
//!   with the stem.
//!
//! When the substitution text itself ends in `*`, the star swallows the
//! remainder of the template: role `P:*` granting `pre-<..>/suffix`
//! expands `assume:P:*` to `pre-*`, not `pre-*/suffix`. The auth service
//! behaves this way, and emulating anything narrower would make `check`
//! pass configurations the service then over-grants. Keep it.
//!
//! The result is normalized: sorted, with any scope covered by a star
//! scope dropped.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{ScopeError, ScopeResult};
use crate::resources::{Resource, ResourceSet};

/// Parameter placeholder in role scope templates
const PARAMETER: &str = "<..>";

/// Rounds of expansion before giving up on convergence
pub const MAX_EXPANSION_ROUNDS: usize = 100;

/// Expands scope sets against a fixed set of roles
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    roles: BTreeMap<String, Vec<String>>,
}

impl ScopeResolver {
    /// Build from `roleId -> scopes` pairs
    pub fn new(roles: BTreeMap<String, Vec<String>>) -> Self {
        Self { roles }
    }

    /// Build from a resource set, ignoring everything but roles
    pub fn from_resources(resources: &ResourceSet) -> Self {
        let mut roles = BTreeMap::new();
        for resource in resources.iter() {
            if let Resource::Role(role) = resource {
                roles.insert(role.role_id.clone(), role.scopes.clone());
            }
        }
        Self { roles }
    }

    /// Expand a scope set to its fixed point.
    ///
    /// Each distinct scope is expanded against every role exactly once;
    /// scopes produced in one round are processed in the next. Cyclic role
    /// graphs converge (the scope set deduplicates); graphs that keep
    /// minting new scopes hit the round cap and error.
    pub fn expand_scopes(&self, scopes: &[String]) -> ScopeResult<Vec<String>> {
        let mut all: BTreeSet<String> = scopes.iter().cloned().collect();
        let mut processed: HashSet<String> = HashSet::new();

        for _ in 0..MAX_EXPANSION_ROUNDS {
            let snapshot: Vec<String> = all.iter().cloned().collect();
            let before = all.len();

            for scope in &snapshot {
                if !processed.insert(scope.clone()) {
                    continue;
                }

                for (role, role_scopes) in &self.roles {
                    let assume = format!("assume:{}", role);

                    if role.ends_with('*') {
                        let stem = &assume[..assume.len() - 1];
                        if let Some(matched) = scope.strip_prefix(stem) {
                            for s in star_match(matched, role_scopes) {
                                all.insert(s);
                            }
                        }
                    }

                    if let Some(stem) = scope.strip_suffix('*') {
                        if assume.starts_with(stem) {
                            if assume.ends_with('*') {
                                for s in star_match("*", role_scopes) {
                                    all.insert(s);
                                }
                            } else {
                                for s in role_scopes {
                                    all.insert(s.clone());
                                }
                            }
                        }
                    }

                    if *scope == assume {
                        for s in role_scopes {
                            all.insert(s.clone());
                        }
                    }
                }
            }

            if all.len() == before {
                return Ok(normalize_scopes(all));
            }
        }

        Err(ScopeError::DepthExceeded {
            rounds: MAX_EXPANSION_ROUNDS,
        })
    }
}

/// Substitute the star-matched text into each role scope template.
///
/// A substitution ending in `*` replaces from the first placeholder to the
/// end of the template; otherwise every placeholder is replaced. Templates
/// without a placeholder pass through unchanged.
fn star_match(matched: &str, role_scopes: &[String]) -> Vec<String> {
    role_scopes
        .iter()
        .map(|template| match template.find(PARAMETER) {
            Some(idx) if matched.ends_with('*') => format!("{}{}", &template[..idx], matched),
            Some(_) => template.replace(PARAMETER, matched),
            None => template.clone(),
        })
        .collect()
}

/// Normalize a scope set: deduplicate, drop scopes covered by a star scope,
/// sort.
pub fn normalize_scopes<I>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let set: BTreeSet<String> = scopes.into_iter().collect();
    set.iter()
        .filter(|scope| {
            set.iter().all(|other| {
                scope.as_str() == other.as_str()
                    || !(other.ends_with('*') && scope.starts_with(&other[..other.len() - 1]))
            })
        })
        .cloned()
        .collect()
}

/// True when every scope in `require` is covered by some scope in `have`
pub fn satisfies(have: &[String], require: &[String]) -> bool {
    require.iter().all(|req| {
        have.iter().any(|h| {
            h == req || (h.ends_with('*') && req.starts_with(&h[..h.len() - 1]))
        })
    })
}
