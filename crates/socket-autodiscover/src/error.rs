//! Error types for socket autodiscovery

use thiserror::Error;

/// Autodiscovery error type
#[derive(Error, Debug)]
pub enum Error {
    /// The socket monitor could not be started
    ///
    /// Fatal for the provider and the collector: neither has a degraded mode
    /// without the capture layer.
    #[error("unable to start socket monitor: {0}")]
    MonitorStart(#[source] socket_monitor::Error),

    /// Module is not known to the catalog
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// Catalog contents are inconsistent
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Template definition is unusable
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
