//! Sequential reconciliation
//!
//! Applies a plan one change at a time, each awaited to completion before
//! the next begins. This is deliberate: the auth service serializes role
//! changes and recomputes derived state after each one, so tens of
//! concurrent mutations just queue up server-side until requests start
//! timing out. Being gentle is faster in practice.
//!
//! A failure stops the run where it stands; there is no rollback. The
//! remote is left partially converged, and the documented recovery is to
//! rerun, which picks up from whatever the next diff says is left.

pub mod callbacks;
pub mod plan;

pub use callbacks::{ApplyCallback, CallbackRegistry};
pub use plan::{plan, Action, Change};

use colored::Colorize;
use tracing::{info, instrument};

use crate::cluster::SharedClusterApi;
use crate::error::{ApplyError, ClusterError, ClusterResult, Result};
use crate::resources::{Resource, ResourceSet};

pub struct Reconciler {
    api: SharedClusterApi,
    callbacks: CallbackRegistry,
}

impl Reconciler {
    pub fn new(api: SharedClusterApi) -> Self {
        Self {
            api,
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    /// Converge the live state to `generated`. Returns the number of
    /// changes applied.
    #[instrument(skip(self, generated, current))]
    pub async fn reconcile(
        &self,
        generated: &ResourceSet,
        current: &ResourceSet,
    ) -> Result<usize> {
        let changes = plan::plan(generated, current);
        let total = changes.len();
        info!(total, "applying changes");

        for (index, change) in changes.iter().enumerate() {
            self.apply_change(change, index + 1, total).await?;
        }
        Ok(total)
    }

    async fn apply_change(&self, change: &Change, step: usize, total: usize) -> Result<()> {
        let action = change.action();
        let resource = change.resource();
        let id = resource.id();

        // a secret we never fetched the value of cannot be written; fail
        // here rather than send an empty value to the remote
        if let Resource::Secret(secret) = resource {
            if matches!(action, Action::Create | Action::Update) && !secret.has_value() {
                return Err(ApplyError::MissingSecret { id }.into());
            }
        }

        self.callbacks.run_before(action, resource).await?;

        match action {
            Action::Create => println!("{} {}", "Creating".green(), id),
            Action::Update => println!("{} {}", "Updating".yellow(), id),
            Action::Delete => println!("{} {}", "Deleting".red(), id),
        }

        self.dispatch(action, resource)
            .await
            .map_err(|source| ApplyError::Failed {
                verb: action.verb(),
                id: id.clone(),
                step,
                total,
                source,
            })?;

        self.callbacks.run_after(action, resource).await?;
        Ok(())
    }

    async fn dispatch(&self, action: Action, resource: &Resource) -> ClusterResult<()> {
        match (action, resource) {
            (Action::Create, Resource::Role(role)) => self.api.create_role(role).await,
            (Action::Update, Resource::Role(role)) => self.api.update_role(role).await,
            (Action::Delete, Resource::Role(role)) => self.api.delete_role(&role.role_id).await,

            (Action::Create, Resource::Client(client)) => self.api.create_client(client).await,
            (Action::Update, Resource::Client(client)) => self.api.update_client(client).await,
            (Action::Delete, Resource::Client(client)) => {
                self.api.delete_client(&client.client_id).await
            }

            (Action::Create, Resource::Hook(hook)) => self.api.create_hook(hook).await,
            (Action::Update, Resource::Hook(hook)) => self.api.update_hook(hook).await,
            (Action::Delete, Resource::Hook(hook)) => {
                self.api.delete_hook(&hook.hook_group_id, &hook.hook_id).await
            }

            (Action::Create, Resource::WorkerPool(pool)) => {
                match self.api.create_worker_pool(pool).await {
                    // a pool pending deletion lingers under null-provider and
                    // creates collide with it; updating in place revives it
                    Err(ClusterError::Conflict { .. }) => self.api.update_worker_pool(pool).await,
                    other => other,
                }
            }
            (Action::Update, Resource::WorkerPool(pool)) => {
                self.api.update_worker_pool(pool).await
            }
            (Action::Delete, Resource::WorkerPool(pool)) => {
                self.api.delete_worker_pool(&pool.worker_pool_id).await
            }

            (Action::Create | Action::Update, Resource::Secret(secret)) => {
                self.api.set_secret(secret).await
            }
            (Action::Delete, Resource::Secret(secret)) => {
                self.api.delete_secret(&secret.name).await
            }
        }
    }
}
