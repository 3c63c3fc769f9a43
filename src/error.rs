//! Error types for devdb operations.
//!
//! Configuration and store errors are fatal for a generate run. Individual
//! statement failures during restore are not errors at this level; they are
//! collected in [`crate::restore::RestoreStats`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a source or target store.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::new(err.to_string())
    }
}

/// Main error type for devdb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete specification document
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source store query or introspection failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Dump file passed to restore does not exist
    #[error("Dump file not found: {}", .0.display())]
    DumpNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::Store(StoreError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
