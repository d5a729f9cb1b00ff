//! Storage layer error types

use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Game server not found: {0}")]
    ServerNotFound(String),

    #[error("Batch limit exceeded: {got} entries (maximum {max})")]
    BatchLimitExceeded { got: usize, max: usize },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
