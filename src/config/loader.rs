//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Well-known cluster environment variables (CLUSTER_*)
//! 2. Environment variables (DECKHAND_*)
//! 3. Configuration file (TOML)
//! 4. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "deckhand.toml",
    ".deckhand.toml",
    "~/.config/deckhand/config.toml",
    "/etc/deckhand/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with DECKHAND_ prefix
    // e.g., DECKHAND_CLUSTER__ROOT_URL, DECKHAND_SOURCES__DIRECTORY
    // Double underscore (__) maps to nested keys (cluster.root_url)
    builder = builder.add_source(
        Environment::with_prefix("DECKHAND")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. Handle the well-known cluster credential variables, which win over
    // everything else so one shell export switches deployments
    for (env_var, key) in &[
        ("CLUSTER_ROOT_URL", "cluster.root_url"),
        ("CLUSTER_CLIENT_ID", "cluster.client_id"),
        ("CLUSTER_ACCESS_TOKEN", "cluster.access_token"),
        ("CLUSTER_PROXY_URL", "cluster.proxy_url"),
    ] {
        if let Ok(value) = std::env::var(env_var) {
            builder = builder
                .set_override(*key, value)
                .map_err(|e| ConfigError::Load(e.to_string()))?;
        }
    }

    // Build and deserialize
    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    // Validate the configuration
    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values.
///
/// Credentials are deliberately not required here: reads against most
/// deployments are anonymous, and `apply` preflights its own requirement
/// via `ClusterConfig::require_credentials`.
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // Validate cluster root URL
    if config.cluster.root_url.is_empty() {
        return Err(ConfigError::Missing {
            field: "cluster.root_url (set CLUSTER_ROOT_URL environment variable)".to_string(),
        });
    }

    validate_url(&config.cluster.root_url, "cluster.root_url")?;

    if let Some(proxy_url) = &config.cluster.proxy_url {
        validate_url(proxy_url, "cluster.proxy_url")?;
    }

    // Validate timeout
    if config.cluster.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "cluster.timeout_secs must be greater than 0".to_string(),
        });
    }

    // The active environment must resolve, and every environment must pin a
    // plausible root URL
    if let Some(name) = &config.environment {
        if !config.environments.contains_key(name) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "environment '{}' is not defined under [environments]",
                    name
                ),
            });
        }
    }
    for (name, environment) in &config.environments {
        validate_url(
            &environment.root_url,
            &format!("environments.{}.root_url", name),
        )?;
    }

    Ok(())
}

fn validate_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Invalid {
            message: format!(
                "{} must start with http:// or https://, got: {}",
                field, url
            ),
        });
    }
    Ok(())
}
