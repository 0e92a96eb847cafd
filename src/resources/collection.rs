//! The `ResourceSet` collection
//!
//! Holds resources keyed by id alongside the `PatternSet` declaring which
//! ids the deployment owns. The ownership patterns are load-bearing: they
//! are what lets the reconciler delete resources that are no longer
//! declared, and what protects everything outside them from being touched
//! at all.
//!
//! Two invariants hold at every public-method boundary: every contained id
//! matches the managed patterns, and ids are unique. `add` merges same-id
//! declarations where the kind supports it; bulk construction (including
//! deserialization) treats a repeated id as an error.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};

use super::patterns::PatternSet;
use super::resource::{indent, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResourceSet")]
pub struct ResourceSet {
    managed: PatternSet,
    #[serde(serialize_with = "resources_as_sorted_seq")]
    resources: BTreeMap<String, Resource>,
}

fn resources_as_sorted_seq<S: Serializer>(
    resources: &BTreeMap<String, Resource>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(resources.values())
}

/// Serialized form; construction re-checks the invariants
#[derive(Deserialize)]
struct RawResourceSet {
    managed: PatternSet,
    #[serde(default)]
    resources: Vec<Resource>,
}

impl TryFrom<RawResourceSet> for ResourceSet {
    type Error = ResourceError;

    fn try_from(raw: RawResourceSet) -> ResourceResult<Self> {
        ResourceSet::from_parts(raw.managed, raw.resources)
    }
}

impl ResourceSet {
    /// An empty set managing nothing
    pub fn new() -> Self {
        Self {
            managed: PatternSet::empty(),
            resources: BTreeMap::new(),
        }
    }

    /// An empty set with ownership already declared
    pub fn with_managed(managed: PatternSet) -> Self {
        Self {
            managed,
            resources: BTreeMap::new(),
        }
    }

    /// Build from an ownership set and a resource list.
    ///
    /// Unlike `add`, a repeated id here is always an error; merging is a
    /// declaration-time affordance, not a license for duplicate documents.
    pub fn from_parts(
        managed: PatternSet,
        resources: Vec<Resource>,
    ) -> ResourceResult<Self> {
        let mut set = Self {
            managed,
            resources: BTreeMap::new(),
        };
        for resource in resources {
            let resource = resource.normalized();
            let id = resource.id();
            if !set.managed.matches(&id) {
                return Err(ResourceError::Unmanaged { id });
            }
            if set.resources.contains_key(&id) {
                return Err(ResourceError::Duplicate {
                    id,
                    kind: resource.kind(),
                });
            }
            set.resources.insert(id, resource);
        }
        Ok(set)
    }

    /// Declare ownership of ids matching `pattern`
    pub fn manage(&mut self, pattern: &str) -> ResourceResult<()> {
        self.managed.add(pattern)
    }

    /// Add one resource.
    ///
    /// The resource is normalized first. An id outside the managed patterns
    /// is rejected; an id already present merges (roles and clients) or
    /// fails as a duplicate (everything else).
    pub fn add(&mut self, resource: Resource) -> ResourceResult<()> {
        let resource = resource.normalized();
        let id = resource.id();
        if !self.managed.matches(&id) {
            return Err(ResourceError::Unmanaged { id });
        }
        let resolved = match self.resources.get(&id) {
            Some(existing) => existing.merge(&resource)?,
            None => resource,
        };
        self.resources.insert(id, resolved);
        Ok(())
    }

    /// Add a batch of resources, all or nothing.
    ///
    /// Changes are staged on a copy and committed only when every resource
    /// was accepted, so a failed batch leaves the set untouched.
    pub fn update<I>(&mut self, resources: I) -> ResourceResult<()>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut staged = self.clone();
        for resource in resources {
            staged.add(resource)?;
        }
        *self = staged;
        Ok(())
    }

    /// Union another set into this one: ownership patterns combine, and the
    /// other set's resources are added (merging where ids collide). All or
    /// nothing, like `update`.
    pub fn merge(&mut self, other: &ResourceSet) -> ResourceResult<()> {
        let mut staged = self.clone();
        staged.managed.extend(&other.managed)?;
        for resource in other.resources.values() {
            staged.add(resource.clone())?;
        }
        *self = staged;
        Ok(())
    }

    /// A new set holding only resources whose id matches `pattern`
    /// (unanchored regex). Ownership patterns carry over unchanged.
    pub fn filter(&self, pattern: &str) -> ResourceResult<ResourceSet> {
        let regex = Regex::new(pattern).map_err(|e| ResourceError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            managed: self.managed.clone(),
            resources: self
                .resources
                .iter()
                .filter(|(id, _)| regex.is_match(id))
                .map(|(id, resource)| (id.clone(), resource.clone()))
                .collect(),
        })
    }

    /// A new set with `f` applied to every resource.
    ///
    /// The result is rebuilt from scratch, so a transform that moves a
    /// resource out of the managed patterns, or onto a colliding id, errors.
    pub fn map<F>(&self, f: F) -> ResourceResult<ResourceSet>
    where
        F: Fn(Resource) -> Resource,
    {
        Self::from_parts(
            self.managed.clone(),
            self.resources.values().cloned().map(f).collect(),
        )
    }

    pub fn is_managed(&self, id: &str) -> bool {
        self.managed.matches(id)
    }

    pub fn managed(&self) -> &PatternSet {
        &self.managed
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Resources in id order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(|id| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "managed:")?;
        for source in self.managed.sorted_sources() {
            writeln!(f, "  - {}", source)?;
        }
        writeln!(f)?;
        writeln!(f, "resources:")?;
        let rendered: Vec<String> = self
            .resources
            .values()
            .map(|r| indent(&r.to_string(), "  "))
            .collect();
        write!(f, "{}", rendered.join("\n\n"))
    }
}
