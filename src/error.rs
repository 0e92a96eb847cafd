//! Error types for deckhand
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API and
//! convert to exit codes at the CLI boundary.
//!
//! Data-integrity violations (unmanaged resources, duplicate ids, malformed
//! patterns) are never caught-and-continued: they indicate a bug in a
//! generator or in configuration and abort the run that raised them.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Scope resolution error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Config source error: {0}")]
    Source(#[from] SourceError),

    #[error("Cluster API error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resource-model and collection errors
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Empty strings are not allowed as patterns")]
    EmptyPattern,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unmanaged resource: {id}")]
    Unmanaged { id: String },

    #[error("duplicate resource: {id}")]
    Duplicate { id: String, kind: &'static str },

    #[error("cannot merge {id}: {field} fields differ")]
    MergeConflict { id: String, field: &'static str },

    #[error("Invalid resource data: {0}")]
    Invalid(String),
}

/// Scope-expansion errors
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Plain role cycles converge because scope sets deduplicate; hitting the
    /// round cap means a parameterized role graph that mints ever-longer
    /// scopes and must be fixed in configuration.
    #[error("scope expansion did not converge within {rounds} rounds")]
    DepthExceeded { rounds: usize },
}

/// Errors from a `ConfigSource`
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No such config document: {name}")]
    NotFound { name: String },

    #[error("Failed to parse config document '{name}': {reason}")]
    Parse { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cluster REST API errors
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Cluster API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 409; surfaced distinctly because worker-pool creation treats a
    /// conflict (pool lingering in pending-delete) as "update instead".
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthorized: invalid or missing credentials")]
    Unauthorized,

    #[error("Invalid response from cluster service: {0}")]
    InvalidResponse(String),
}

impl ClusterError {
    /// Create an appropriate error from an HTTP status code and response body
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ClusterError::Unauthorized,
            404 => ClusterError::NotFound {
                resource: "requested resource".into(),
            },
            409 => ClusterError::Conflict {
                message: if body.is_empty() {
                    "resource already exists".to_string()
                } else {
                    body.to_string()
                },
            },
            _ => ClusterError::Api {
                status,
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                },
            },
        }
    }

    /// True for transport-level failures worth retrying on read paths
    pub fn is_retryable(&self) -> bool {
        match self {
            ClusterError::Request(e) => e.is_timeout() || e.is_connect(),
            ClusterError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised while applying a reconciliation plan
#[derive(Error, Debug)]
pub enum ApplyError {
    /// A remote mutation failed. Carries the verb, the resource id, and the
    /// position in the sequential plan so the operator knows exactly which
    /// step was in flight when the run stopped.
    #[error("error while applying {verb} {id} ({step} of {total}): {source}")]
    Failed {
        verb: &'static str,
        id: String,
        step: usize,
        total: usize,
        #[source]
        source: ClusterError,
    },

    /// Local precondition: a secret with no known value can never be written
    /// to the remote (fetch values with --with-secrets first).
    #[error("cannot write {id}: no secret value is present")]
    MissingSecret { id: String },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for cluster API operations
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Result type alias for scope expansion
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Result type alias for resource-model operations
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;
