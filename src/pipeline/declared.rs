//! Declared-resources generator
//!
//! The simplest possible generator: a config document that is already the
//! serialized form of a resource set (`{"managed": [...], "resources":
//! [...]}`). Useful on its own for deployments whose desired state is
//! maintained by hand or by an external tool, and as the reference for
//! what any generator must do: declare ownership, then add.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Result, SourceError};
use crate::resources::ResourceSet;

use super::source::SourceCache;
use super::Generator;

pub struct DeclaredResources {
    cache: Arc<SourceCache>,
    document: String,
}

impl DeclaredResources {
    pub fn new(cache: Arc<SourceCache>, document: impl Into<String>) -> Self {
        Self {
            cache,
            document: document.into(),
        }
    }
}

#[async_trait]
impl Generator for DeclaredResources {
    #[instrument(skip(self, resources), fields(document = %self.document))]
    async fn generate(&self, resources: &mut ResourceSet) -> Result<()> {
        let value = self.cache.json(&self.document).await?;
        let declared: ResourceSet =
            serde_json::from_value((*value).clone()).map_err(|e| SourceError::Parse {
                name: self.document.clone(),
                reason: e.to_string(),
            })?;

        for pattern in declared.managed().sorted_sources() {
            resources.manage(pattern)?;
        }
        resources.update(declared.iter().cloned())?;
        debug!(count = declared.len(), "declared resources loaded");
        Ok(())
    }
}
