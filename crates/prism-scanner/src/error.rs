//! Scan engine errors.

use prism_core::{PrismError, TaskId, TaskState};
use thiserror::Error;

/// Errors surfaced by task management.
///
/// Per-file failures never show up here: they finish the file as FAILED.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No task with this ID exists.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// The task's state does not allow the action.
    #[error("cannot {action} task {task_id} while it is {state}")]
    InvalidState {
        /// Task acted on
        task_id: TaskId,
        /// State it was found in
        state: TaskState,
        /// Requested action
        action: &'static str,
    },

    /// Task store failure.
    #[error("store error: {0}")]
    Store(#[from] prism_db::DatabaseError),

    /// Detector selection failure.
    #[error("detector error: {0}")]
    Detect(#[from] prism_detect::DetectError),

    /// A blocking job panicked or was cancelled by the runtime.
    #[error("background job failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

impl From<ScanError> for PrismError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Store(e) => e.into(),
            ScanError::Detect(e) => e.into(),
            ScanError::InvalidState { .. } => PrismError::Validation(err.to_string()),
            other => PrismError::Internal(other.to_string()),
        }
    }
}
