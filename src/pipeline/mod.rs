//! Resource generation pipeline
//!
//! Desired state is produced by a `Pipeline`: a registration-ordered list
//! of generators followed by a registration-ordered list of modifiers.
//! Generators run concurrently, each into its own empty `ResourceSet`
//! (every generator declares ownership with `manage` before adding), and
//! the partial sets are merged once all of them finish. Modifiers then run
//! sequentially, each replacing the set wholesale.
//!
//! Configuration documents come from a `ConfigSource` behind a per-run
//! `SourceCache`; nothing here touches process globals, so two pipelines
//! in one process cannot see each other's state.

pub mod declared;
pub mod environment;
pub mod source;

pub use declared::DeclaredResources;
pub use environment::Environment;
pub use source::{ConfigSource, LocalSource, SourceCache, StaticSource};

// async_trait required for dyn-compatibility with Box<dyn Generator>
use async_trait::async_trait;
use futures::future;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::resources::ResourceSet;

/// Produces resources into an initially-empty set.
///
/// A generator must `manage` every id namespace it intends to populate;
/// adding a resource outside its own declared patterns is an error, which
/// keeps generators honest about what they own.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, resources: &mut ResourceSet) -> Result<()>;
}

/// Rewrites a generated set, returning a new one.
///
/// Used for environment-specific adjustments after generation, such as
/// stripping hook schedules in staging.
#[async_trait]
pub trait Modifier: Send + Sync {
    async fn modify(&self, resources: ResourceSet) -> Result<ResourceSet>;
}

/// The generate step: registered generators, then registered modifiers
pub struct Pipeline {
    generators: Vec<Box<dyn Generator>>,
    modifiers: Vec<Box<dyn Modifier>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            generators: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn register_generator<G: Generator + 'static>(&mut self, generator: G) {
        self.generators.push(Box::new(generator));
    }

    pub fn register_modifier<M: Modifier + 'static>(&mut self, modifier: M) {
        self.modifiers.push(Box::new(modifier));
    }

    /// Run every generator, merge their output, then apply modifiers in
    /// registration order.
    #[instrument(skip(self), fields(generators = self.generators.len()))]
    pub async fn run(&self) -> Result<ResourceSet> {
        let partials = future::try_join_all(self.generators.iter().map(|generator| async move {
            let mut partial = ResourceSet::new();
            generator.generate(&mut partial).await?;
            Ok::<_, crate::error::AppError>(partial)
        }))
        .await?;

        let mut resources = ResourceSet::new();
        for partial in partials {
            resources.merge(&partial)?;
        }
        debug!(count = resources.len(), "generation complete");

        for modifier in &self.modifiers {
            resources = modifier.modify(resources).await?;
        }
        Ok(resources)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
