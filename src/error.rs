//! Error types for Kikk.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for Kikk operations.
#[derive(Error, Debug)]
pub enum KikkError {
    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Embedding provider failed during {operation}: {message}")]
    ProviderFailure { operation: String, message: String },

    #[error("Vector store at {} is corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Dimension mismatch for '{key}': expected {expected}, got {actual}")]
    DimensionMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl KikkError {
    /// Build a provider failure for the given operation.
    pub fn provider(operation: &str, message: impl Into<String>) -> Self {
        KikkError::ProviderFailure {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for Kikk operations.
pub type Result<T> = std::result::Result<T, KikkError>;
