//! Enumeration of eligible files under a task's root path.

use crate::events::ScanEvents;
use prism_core::{FileId, FileState, ScanParams, TaskFile, TaskId};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

/// Outcome of walking a root path.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// One pending work item per file with a selected extension
    pub files: Vec<TaskFile>,
    /// Every regular file seen, selected or not
    pub total: u64,
    /// The walk stopped early because the task was stopped
    pub interrupted: bool,
}

/// Walk `root` and collect the files a task will scan.
///
/// Symlinks are not followed. Unreadable directories and entries are skipped.
/// A root that is itself a file is enumerated as a single entry.
pub fn enumerate(
    task_id: &TaskId,
    root: &Path,
    params: &ScanParams,
    events: &dyn ScanEvents,
    cancel: &CancellationToken,
) -> Enumeration {
    let mut result = Enumeration::default();

    for entry in WalkDir::new(root).follow_links(false) {
        if cancel.is_cancelled() {
            result.interrupted = true;
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(task_id = %task_id, error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        result.total += 1;
        let path = entry.path();
        if !params.matches_extension(path) {
            continue;
        }

        let size_bytes = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                debug!(task_id = %task_id, path = %path.display(), error = %e, "No metadata");
                0
            }
        };
        events.on_file_found(task_id, path);
        result.files.push(TaskFile {
            id: FileId::generate(),
            task_id: task_id.clone(),
            path: path.to_path_buf(),
            size_bytes,
            state: FileState::Pending,
        });
    }

    debug!(
        task_id = %task_id,
        root = %root.display(),
        total = result.total,
        selected = result.files.len(),
        interrupted = result.interrupted,
        "Enumeration finished"
    );
    result
}
