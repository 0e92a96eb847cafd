//! Live-state fetch
//!
//! Builds a `ResourceSet` describing what actually exists on the cluster,
//! restricted to the managed patterns. The five kinds are fetched
//! concurrently (they live on different services) and merged afterward;
//! each fetcher fills its own partial set so nothing shares mutable state.
//!
//! Everything outside the managed patterns is dropped at the edge, before
//! it can enter a set, so an id foreign to this deployment can never be
//! diffed or deleted.

use tracing::{debug, instrument};

use crate::cluster::ClusterApi;
use crate::error::Result;
use crate::resources::{worker_pool::NULL_PROVIDER, PatternSet, Resource, ResourceSet};

/// Fetch the current state of all managed resources.
///
/// Secret values are only fetched when `with_secrets` is set; without it,
/// secrets are known by name alone, which is enough to diff existence but
/// not content.
#[instrument(skip(api, managed), fields(with_secrets))]
pub async fn fetch_current(
    api: &dyn ClusterApi,
    managed: &PatternSet,
    with_secrets: bool,
) -> Result<ResourceSet> {
    let (roles, clients, hooks, pools, secrets) = tokio::try_join!(
        fetch_roles(api, managed),
        fetch_clients(api, managed),
        fetch_hooks(api, managed),
        fetch_worker_pools(api, managed),
        fetch_secrets(api, managed, with_secrets),
    )?;

    let mut current = ResourceSet::with_managed(managed.clone());
    for partial in [roles, clients, hooks, pools, secrets] {
        current.merge(&partial)?;
    }
    Ok(current)
}

async fn fetch_roles(api: &dyn ClusterApi, managed: &PatternSet) -> Result<ResourceSet> {
    let mut resources = ResourceSet::with_managed(managed.clone());
    for role in api.list_roles().await? {
        let resource = Resource::Role(role);
        if resources.is_managed(&resource.id()) {
            resources.add(resource)?;
        }
    }
    debug!(count = resources.len(), "fetched roles");
    Ok(resources)
}

async fn fetch_clients(api: &dyn ClusterApi, managed: &PatternSet) -> Result<ResourceSet> {
    let mut resources = ResourceSet::with_managed(managed.clone());
    for client in api.list_clients().await? {
        let resource = Resource::Client(client);
        if resources.is_managed(&resource.id()) {
            resources.add(resource)?;
        }
    }
    debug!(count = resources.len(), "fetched clients");
    Ok(resources)
}

async fn fetch_hooks(api: &dyn ClusterApi, managed: &PatternSet) -> Result<ResourceSet> {
    let mut resources = ResourceSet::with_managed(managed.clone());
    for group in api.list_hook_groups().await? {
        // skip groups where nothing could be managed anyway
        let id_prefix = format!("Hook={}/", group);
        if !managed.matches_prefix(&id_prefix) {
            debug!(group = %group, "skipping unmanaged hook group");
            continue;
        }
        for hook in api.list_hooks(&group).await? {
            let resource = Resource::Hook(hook);
            if resources.is_managed(&resource.id()) {
                resources.add(resource)?;
            }
        }
    }
    debug!(count = resources.len(), "fetched hooks");
    Ok(resources)
}

async fn fetch_worker_pools(api: &dyn ClusterApi, managed: &PatternSet) -> Result<ResourceSet> {
    let mut resources = ResourceSet::with_managed(managed.clone());
    for pool in api.list_worker_pools().await? {
        // pools pending deletion sit on the null provider until the service
        // reaps them; treat them as already gone
        if pool.provider_id == NULL_PROVIDER {
            continue;
        }
        let resource = Resource::WorkerPool(pool);
        if resources.is_managed(&resource.id()) {
            resources.add(resource)?;
        }
    }
    debug!(count = resources.len(), "fetched worker pools");
    Ok(resources)
}

async fn fetch_secrets(
    api: &dyn ClusterApi,
    managed: &PatternSet,
    with_secrets: bool,
) -> Result<ResourceSet> {
    let mut resources = ResourceSet::with_managed(managed.clone());
    for name in api.list_secret_names().await? {
        if !resources.is_managed(&format!("Secret={}", name)) {
            continue;
        }
        let secret = if with_secrets {
            let value = api.get_secret(&name).await?;
            crate::resources::Secret::with_value(name, value)
        } else {
            crate::resources::Secret::new(name)
        };
        resources.add(Resource::Secret(secret))?;
    }
    debug!(count = resources.len(), "fetched secrets");
    Ok(resources)
}
