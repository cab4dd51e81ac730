//! Session store error types.

use std::time::Duration;
use thiserror::Error;

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Operation timed out
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;
