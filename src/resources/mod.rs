//! Resource model
//!
//! The five kinds of runtime-configuration resource this tool manages, plus
//! the ownership `PatternSet` and the `ResourceSet` collection that holds
//! them.
//!
//! ## Identity
//!
//! Every resource has a kind-qualified id:
//!
//! - `Role=<roleId>`
//! - `Client=<clientId>`
//! - `Hook=<hookGroupId>/<hookId>`
//! - `WorkerPool=<workerPoolId>`
//! - `Secret=<name>`
//!
//! Ids are the sole join key between the generated and the live state: the
//! differ and the reconciler pair resources by id alone.
//!
//! ## Normalization
//!
//! Descriptions get a fixed `*DO NOT EDIT*` banner so humans browsing the
//! cluster UI know edits will be overwritten; scope lists are sorted and
//! deduplicated. Normalization is applied on construction and again whenever
//! a resource enters a `ResourceSet`, so comparing two sets compares
//! canonical forms.

pub mod client;
pub mod collection;
pub mod hook;
pub mod patterns;
pub mod resource;
pub mod role;
pub mod secret;
pub mod worker_pool;

pub use client::Client;
pub use collection::ResourceSet;
pub use hook::{Binding, Hook};
pub use patterns::PatternSet;
pub use resource::{FieldValue, Resource};
pub use role::Role;
pub use secret::Secret;
pub use worker_pool::WorkerPool;

/// Banner prepended to every managed description.
pub const DESCRIPTION_PREFIX: &str =
    "*DO NOT EDIT* - This resource is configured automatically.\n\n";

/// Expiry used for clients and secrets, which this tool manages as permanent.
pub const EXPIRES_FOREVER: &str = "3000-01-01T00:00:00.000Z";

/// Prepend the banner unless it is already present
pub(crate) fn normalize_description(value: &str) -> String {
    if value.starts_with(DESCRIPTION_PREFIX) {
        value.to_string()
    } else {
        format!("{}{}", DESCRIPTION_PREFIX, value)
    }
}

/// Sort and deduplicate a scope list
pub(crate) fn normalize_scope_list(mut scopes: Vec<String>) -> Vec<String> {
    scopes.sort_unstable();
    scopes.dedup();
    scopes
}
