//! Apply callbacks
//!
//! Hooks into the apply sequence, run before and after each mutation.
//! Deployments use these for side channels the reconciler itself should
//! not know about, like announcing role changes in chat or snapshotting
//! secrets before deletion. Each registration is filtered by action and
//! by resource kind; a callback error aborts the run like any other.

// async_trait required for dyn-compatibility with Box<dyn ApplyCallback>
use async_trait::async_trait;

use crate::error::Result;
use crate::resources::Resource;

use super::plan::Action;

#[async_trait]
pub trait ApplyCallback: Send + Sync {
    async fn run(&self, action: Action, resource: &Resource) -> Result<()>;
}

struct Registered {
    actions: Vec<Action>,
    kinds: Vec<&'static str>,
    callback: Box<dyn ApplyCallback>,
}

impl Registered {
    fn applies_to(&self, action: Action, resource: &Resource) -> bool {
        self.actions.contains(&action) && self.kinds.contains(&resource.kind())
    }
}

/// Before/after callback lists, each run in registration order
#[derive(Default)]
pub struct CallbackRegistry {
    before: Vec<Registered>,
    after: Vec<Registered>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` before each matching mutation. Pass `Action::ALL`
    /// and `Resource::KINDS` to match everything.
    pub fn on_before<C: ApplyCallback + 'static>(
        &mut self,
        actions: &[Action],
        kinds: &[&'static str],
        callback: C,
    ) {
        self.before.push(Registered {
            actions: actions.to_vec(),
            kinds: kinds.to_vec(),
            callback: Box::new(callback),
        });
    }

    /// Run `callback` after each matching mutation
    pub fn on_after<C: ApplyCallback + 'static>(
        &mut self,
        actions: &[Action],
        kinds: &[&'static str],
        callback: C,
    ) {
        self.after.push(Registered {
            actions: actions.to_vec(),
            kinds: kinds.to_vec(),
            callback: Box::new(callback),
        });
    }

    pub(crate) async fn run_before(&self, action: Action, resource: &Resource) -> Result<()> {
        for registered in &self.before {
            if registered.applies_to(action, resource) {
                registered.callback.run(action, resource).await?;
            }
        }
        Ok(())
    }

    pub(crate) async fn run_after(&self, action: Action, resource: &Resource) -> Result<()> {
        for registered in &self.after {
            if registered.applies_to(action, resource) {
                registered.callback.run(action, resource).await?;
            }
        }
        Ok(())
    }
}
