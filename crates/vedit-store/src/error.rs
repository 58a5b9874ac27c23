//! Metadata store error types.

use thiserror::Error;

/// Result type for metadata store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the frame metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to configure metadata store: {0}")]
    ConfigError(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
