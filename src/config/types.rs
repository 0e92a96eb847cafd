//! Configuration types for deckhand
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::pipeline::Environment;
use crate::util::SecretString;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cluster connection settings
    pub cluster: ClusterConfig,

    /// Where config documents live and which ones to load
    pub sources: SourcesConfig,

    /// Name of the active environment (a key of `environments`)
    pub environment: Option<String>,

    /// Named environments that share this declared configuration
    pub environments: HashMap<String, Environment>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            sources: SourcesConfig::default(),
            environment: None,
            environments: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// The active environment, when one is configured.
    ///
    /// The loader validates that the name resolves, so a `None` here means
    /// "no environment configured", never "misspelled".
    pub fn active_environment(&self) -> Option<(&str, &Environment)> {
        let name = self.environment.as_deref()?;
        self.environments
            .get(name)
            .map(|environment| (name, environment))
    }
}

/// Cluster connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Root URL of the cluster-management deployment
    /// (e.g. `https://cluster.example.com`)
    pub root_url: String,

    /// Client id for direct authentication (prefer env var CLUSTER_CLIENT_ID)
    pub client_id: Option<String>,

    /// Access token for direct authentication (prefer env var
    /// CLUSTER_ACCESS_TOKEN)
    pub access_token: Option<SecretString>,

    /// Authenticating proxy URL. When set, requests go to the proxy and
    /// carry no credential headers.
    pub proxy_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed read requests
    pub max_retries: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            client_id: None,
            access_token: None,
            proxy_url: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl ClusterConfig {
    /// Base URL requests are sent to: the proxy when one is configured,
    /// the root URL otherwise
    pub fn base_url(&self) -> String {
        self.proxy_url
            .as_deref()
            .unwrap_or(&self.root_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// Mutating commands need either a proxy or a full credential pair.
    /// Checked before any change is attempted, so a half-configured run
    /// fails before touching the cluster rather than mid-plan.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.proxy_url.is_some() {
            return Ok(());
        }
        if self.client_id.is_some() && self.access_token.is_some() {
            return Ok(());
        }
        Err(ConfigError::Missing {
            field: "cluster.client_id and cluster.access_token (or cluster.proxy_url)"
                .to_string(),
        })
    }
}

/// Config document sources
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Directory config documents are read from
    pub directory: String,

    /// Declared-resource documents to load, in order
    pub documents: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            documents: vec!["resources.json".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ClusterConfig {
            root_url: "https://cluster.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://cluster.example.com");
    }

    #[test]
    fn test_base_url_prefers_proxy() {
        let config = ClusterConfig {
            root_url: "https://cluster.example.com".to_string(),
            proxy_url: Some("http://localhost:8080/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_require_credentials() {
        let bare = ClusterConfig::default();
        assert!(bare.require_credentials().is_err());

        let with_proxy = ClusterConfig {
            proxy_url: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        assert!(with_proxy.require_credentials().is_ok());

        let with_pair = ClusterConfig {
            client_id: Some("deckhand-ci".to_string()),
            access_token: Some(SecretString::new("token")),
            ..Default::default()
        };
        assert!(with_pair.require_credentials().is_ok());

        let id_only = ClusterConfig {
            client_id: Some("deckhand-ci".to_string()),
            ..Default::default()
        };
        assert!(id_only.require_credentials().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cluster.timeout_secs, 30);
        assert_eq!(config.cluster.max_retries, 3);
        assert_eq!(config.sources.directory, ".");
        assert_eq!(config.sources.documents, vec!["resources.json"]);
        assert!(config.environment.is_none());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_active_environment() {
        let mut config = AppConfig::default();
        assert!(config.active_environment().is_none());

        config.environments.insert(
            "staging".to_string(),
            Environment {
                root_url: "https://staging.example.com".to_string(),
                modifiers: vec![],
            },
        );
        config.environment = Some("staging".to_string());
        let (name, environment) = config.active_environment().unwrap();
        assert_eq!(name, "staging");
        assert_eq!(environment.root_url, "https://staging.example.com");
    }

    #[test]
    fn test_debug_never_prints_token() {
        let config = ClusterConfig {
            access_token: Some(SecretString::new("very-secret-token")),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
