//! Database error types.

use prism_core::PrismError;
use thiserror::Error;

/// Task store errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create the database.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A stored value could not be turned back into a model.
    #[error("decode error: {0}")]
    Decode(String),

    /// The task is not in a state that allows the requested transition.
    #[error("invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task being transitioned
        task_id: String,
        /// State found in the store
        from: String,
        /// Requested state
        to: String,
    },

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Failed to encode scan parameters.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

impl From<DatabaseError> for PrismError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidTransition { task_id, from, to } => {
                PrismError::InvalidTransition { task_id, from, to }
            }
            other => PrismError::Store(other.to_string()),
        }
    }
}
