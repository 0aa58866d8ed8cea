//! Error types for StreamProbe configuration and bootstrap

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or setting up logging
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Device '{name}' not found. Available devices: {available}")]
    UnknownDevice { name: String, available: String },

    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
