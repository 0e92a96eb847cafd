//! Cluster service API
//!
//! Typed access to the cluster-management service. One root URL hosts four
//! REST services, each owning some of the managed kinds:
//!
//! - `auth` — roles and clients
//! - `hooks` — hook groups and hooks
//! - `worker-manager` — worker pools
//! - `secrets` — secrets
//!
//! `ClusterApi` is the seam the reconciler and the fetchers run against;
//! `RestClusterClient` is the real implementation. Tests substitute their
//! own implementations to observe call order without a network.

pub mod api;
pub mod rest;

pub use api::{ClusterApi, SharedClusterApi};
pub use rest::RestClusterClient;
