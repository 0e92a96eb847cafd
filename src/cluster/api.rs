//! Cluster API trait
//!
//! One method per verb and kind, mirroring the remote endpoints. Worker
//! pools have no real delete: assigning `null-provider` and letting the
//! service drain the pool is the deletion protocol, which is why
//! `create_worker_pool` can legitimately hit a 409 for a pool the caller
//! believes is gone (callers handle `ClusterError::Conflict` by updating
//! instead).

use std::sync::Arc;

// async_trait required for dyn-compatibility with Arc<dyn ClusterApi>
use async_trait::async_trait;

use crate::error::ClusterResult;
use crate::resources::{Client, Hook, Role, Secret, WorkerPool};

#[async_trait]
pub trait ClusterApi: Send + Sync {
    // auth service

    async fn list_roles(&self) -> ClusterResult<Vec<Role>>;
    async fn create_role(&self, role: &Role) -> ClusterResult<()>;
    async fn update_role(&self, role: &Role) -> ClusterResult<()>;
    async fn delete_role(&self, role_id: &str) -> ClusterResult<()>;

    async fn list_clients(&self) -> ClusterResult<Vec<Client>>;
    async fn create_client(&self, client: &Client) -> ClusterResult<()>;
    async fn update_client(&self, client: &Client) -> ClusterResult<()>;
    async fn delete_client(&self, client_id: &str) -> ClusterResult<()>;

    // hooks service

    async fn list_hook_groups(&self) -> ClusterResult<Vec<String>>;
    async fn list_hooks(&self, hook_group_id: &str) -> ClusterResult<Vec<Hook>>;
    async fn create_hook(&self, hook: &Hook) -> ClusterResult<()>;
    async fn update_hook(&self, hook: &Hook) -> ClusterResult<()>;
    async fn delete_hook(&self, hook_group_id: &str, hook_id: &str) -> ClusterResult<()>;

    // worker-manager service

    async fn list_worker_pools(&self) -> ClusterResult<Vec<WorkerPool>>;
    async fn create_worker_pool(&self, pool: &WorkerPool) -> ClusterResult<()>;
    async fn update_worker_pool(&self, pool: &WorkerPool) -> ClusterResult<()>;
    async fn delete_worker_pool(&self, worker_pool_id: &str) -> ClusterResult<()>;

    // secrets service

    async fn list_secret_names(&self) -> ClusterResult<Vec<String>>;
    async fn get_secret(&self, name: &str) -> ClusterResult<serde_json::Value>;
    /// Create and update are the same write on the secrets service
    async fn set_secret(&self, secret: &Secret) -> ClusterResult<()>;
    async fn delete_secret(&self, name: &str) -> ClusterResult<()>;
}

/// Shared handle used by the concurrent fetchers and the reconciler
pub type SharedClusterApi = Arc<dyn ClusterApi>;
