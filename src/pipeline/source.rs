//! Config document sources
//!
//! Generators read their input documents through a `ConfigSource`, which
//! maps a logical filename to raw bytes. The `SourceCache` wrapper parses
//! and memoizes documents for the lifetime of one run, so generators can
//! re-request the same file freely without refetching or reparsing.

// async_trait required for dyn-compatibility with Box<dyn ConfigSource>
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::SourceError;

/// Supplies raw config documents by logical filename
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load_raw(&self, name: &str) -> Result<Vec<u8>, SourceError>;
}

/// Reads documents from a directory on disk
pub struct LocalSource {
    directory: PathBuf,
}

impl LocalSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl ConfigSource for LocalSource {
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    async fn load_raw(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.directory.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SourceError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(SourceError::Io(e)),
        }
    }
}

/// In-memory document source, mainly for tests
#[derive(Default)]
pub struct StaticSource {
    documents: HashMap<String, Vec<u8>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(name.into(), content.into());
        self
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn load_raw(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Per-run cache over a `ConfigSource`.
///
/// Parsed documents are shared as `Arc<Value>`; the same filename always
/// returns the same value within one run. The cache lives exactly as long
/// as the run that created it, so there is no cross-run staleness to
/// invalidate.
pub struct SourceCache {
    source: Box<dyn ConfigSource>,
    parsed: Mutex<HashMap<String, Arc<Value>>>,
}

impl SourceCache {
    pub fn new<S: ConfigSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            parsed: Mutex::new(HashMap::new()),
        }
    }

    /// Load raw bytes, bypassing the parse cache
    pub async fn raw(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        self.source.load_raw(name).await
    }

    /// Load and parse a JSON document, memoized per filename
    pub async fn json(&self, name: &str) -> Result<Arc<Value>, SourceError> {
        let mut parsed = self.parsed.lock().await;
        if let Some(value) = parsed.get(name) {
            return Ok(Arc::clone(value));
        }

        let raw = self.source.load_raw(name).await?;
        let value: Value = serde_json::from_slice(&raw).map_err(|e| SourceError::Parse {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!(name = %name, "parsed config document");

        let value = Arc::new(value);
        parsed.insert(name.to_string(), Arc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new().with("a.json", br#"{"x": 1}"#.to_vec());
        assert_eq!(source.load_raw("a.json").await.unwrap(), br#"{"x": 1}"#);
        assert!(matches!(
            source.load_raw("missing.json").await,
            Err(SourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.json"), br#"{"ok": true}"#).unwrap();

        let source = LocalSource::new(dir.path());
        assert_eq!(
            source.load_raw("doc.json").await.unwrap(),
            br#"{"ok": true}"#
        );
        assert!(matches!(
            source.load_raw("other.json").await,
            Err(SourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_memoizes() {
        let source = StaticSource::new().with("doc.json", br#"{"n": 42}"#.to_vec());
        let cache = SourceCache::new(source);

        let first = cache.json("doc.json").await.unwrap();
        let second = cache.json("doc.json").await.unwrap();
        assert_eq!(*first, json!({"n": 42}));
        // same Arc, not a re-parse
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_cache_parse_error() {
        let source = StaticSource::new().with("bad.json", b"not json".to_vec());
        let cache = SourceCache::new(source);
        assert!(matches!(
            cache.json("bad.json").await,
            Err(SourceError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_raw_bypasses_cache() {
        let source = StaticSource::new().with("raw.txt", b"plain text".to_vec());
        let cache = SourceCache::new(source);
        assert_eq!(cache.raw("raw.txt").await.unwrap(), b"plain text");
    }
}
