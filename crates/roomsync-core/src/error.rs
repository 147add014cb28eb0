//! Error types for roomsync-core

use thiserror::Error;

/// Result type alias using roomsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in roomsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every feed transport was tried and none returned usable content
    #[error("Feed fetch failed after {attempts} transport(s): {last_error}")]
    FetchFailed { attempts: usize, last_error: String },

    /// The feed payload matched neither JSON nor XML feed shapes
    #[error("Feed parse failed: {0}")]
    ParseFailed(String),
}
