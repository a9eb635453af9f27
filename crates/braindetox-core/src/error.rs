//! Error types shared across the crate.

use thiserror::Error;

/// Top-level error for braindetox-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the key/value storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open store at {path}: {message}")]
    Open { path: String, message: String },

    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or mutating the TOML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from {path}: {message}")]
    Load { path: String, message: String },

    #[error("Failed to save config to {path}: {message}")]
    Save { path: String, message: String },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Rejected inputs: empty identifiers, non-positive durations and limits.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
