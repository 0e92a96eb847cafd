//! deckhand
//!
//! Declarative administration of cluster runtime configuration: roles,
//! clients, hooks, worker pools and secrets, reconciled against a remote
//! cluster-management service.
//!
//! ## How a run works
//!
//! ```text
//! generate (pipeline) ──┐
//!                       ├─→ plan (diff by id) ─→ apply (sequential)
//! fetch current state ──┘
//! ```
//!
//! - **Generate**: registered generators produce the desired
//!   [`ResourceSet`](resources::ResourceSet), each declaring the id
//!   patterns it owns; modifiers then adjust the set per environment.
//! - **Current**: the live state is fetched concurrently per kind,
//!   restricted to the managed patterns.
//! - **Plan & apply**: the id-keyed diff is applied one change at a time.
//!   Only resources matching a managed pattern are ever touched, which is
//!   what makes deletion safe: disappearing from the desired state means
//!   deletion only inside the declared ownership.
//!
//! The [`scopes`] module emulates the auth service's scope expansion so
//! `check` can validate the authorization graph offline. Its star
//! substitution semantics are preserved exactly, including the widening
//! case documented there.

pub mod apply;
pub mod check;
pub mod cluster;
pub mod config;
pub mod current;
pub mod diff;
pub mod error;
pub mod pipeline;
pub mod resources;
pub mod scopes;
pub mod util;

// Re-export main types
pub use apply::Reconciler;
pub use config::{AppConfig, load_config};
pub use current::fetch_current;
pub use error::{AppError, Result};
pub use resources::{PatternSet, Resource, ResourceSet};
pub use scopes::ScopeResolver;
