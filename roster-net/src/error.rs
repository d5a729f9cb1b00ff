//! Network error types

use thiserror::Error;

/// Control-plane errors
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(#[from] roster_db::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for control-plane operations
pub type NetResult<T> = Result<T, NetError>;
