//! Progress callbacks for front-ends.

use prism_core::{TaskFile, TaskId, TaskProgress, TaskState};
use prism_detect::Document;
use std::path::Path;

/// Observer of scan progress.
///
/// Callbacks run on worker and enumeration threads and must not block. Every
/// method defaults to doing nothing.
pub trait ScanEvents: Send + Sync {
    /// An eligible file was found during enumeration.
    fn on_file_found(&self, _task_id: &TaskId, _path: &Path) {}

    /// A task entered a new state.
    fn on_state_changed(&self, _task_id: &TaskId, _state: TaskState) {}

    /// A file reached a terminal state.
    fn on_file_scanned(&self, _task_id: &TaskId, _file: &TaskFile, _document: &Document) {}

    /// File counts changed.
    fn on_progress(&self, _task_id: &TaskId, _progress: &TaskProgress) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl ScanEvents for NoopEvents {}
