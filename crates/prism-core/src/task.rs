//! Scan task models and their lifecycle state machines.
//!
//! A [`Task`] walks one root path and owns one [`TaskFile`] per eligible file.
//! [`TaskState::can_transition_to`] is the single source of truth for which task
//! transitions are legal; the store applies transitions conditionally on it.

use crate::error::PrismError;
use crate::types::{DetectorId, FileId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Lifecycle state of a scan task.
///
/// ```text
/// Loading -> Pending -> Searching -> Scanning -> Completed
///                           |            |          |
///                           +--> Stopped <+          |
///                                 |  ^               |
///                 resume/rescan   v  |   resume/rescan
///                         Scanning / Searching <-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Task row exists but its parameters are not committed yet
    Loading,
    /// Submitted, waiting to be started
    Pending,
    /// Enumerating eligible files under the root path
    Searching,
    /// Files are being claimed and scanned by workers
    Scanning,
    /// Every selected file reached a terminal state
    Completed,
    /// Stopped by the user; resumable
    Stopped,
}

impl TaskState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::{Completed, Loading, Pending, Scanning, Searching, Stopped};
        matches!(
            (self, next),
            (Loading, Pending)
                | (Pending, Searching)
                | (Searching, Scanning | Stopped)
                | (Scanning, Completed | Stopped)
                | (Stopped | Completed, Scanning | Searching)
        )
    }

    /// States a user stop request applies to.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Searching | Self::Scanning)
    }

    /// Stable name used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Pending => "Pending",
            Self::Searching => "Searching",
            Self::Scanning => "Scanning",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Loading" => Ok(Self::Loading),
            "Pending" => Ok(Self::Pending),
            "Searching" => Ok(Self::Searching),
            "Scanning" => Ok(Self::Scanning),
            "Completed" => Ok(Self::Completed),
            "Stopped" => Ok(Self::Stopped),
            other => Err(PrismError::Validation(format!("unknown task state '{other}'"))),
        }
    }
}

/// State of one file unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileState {
    /// Enumerated and claimable
    Pending,
    /// Claimed by exactly one worker
    Scanning,
    /// Scanned successfully
    Completed,
    /// Extraction or matching failed for this file
    Failed,
    /// Not claimed before the task was stopped
    Stopped,
}

impl FileState {
    /// Whether no further work will happen on this file without user action.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Stable name used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Scanning => "Scanning",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileState {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Scanning" => Ok(Self::Scanning),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Stopped" => Ok(Self::Stopped),
            other => Err(PrismError::Validation(format!("unknown file state '{other}'"))),
        }
    }
}

/// The only configuration a scan accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Lowercase file extensions without the leading dot
    pub extensions: BTreeSet<String>,
    /// Enabled detectors
    pub detectors: BTreeSet<DetectorId>,
    /// Sample files instead of reading them completely
    pub fast_scan: bool,
}

impl ScanParams {
    /// Build parameters, normalizing extensions (`".TXT"` becomes `"txt"`).
    ///
    /// # Errors
    /// Returns `PrismError::Validation` when either set is empty.
    pub fn new<E, S>(
        extensions: E,
        detectors: impl IntoIterator<Item = DetectorId>,
        fast_scan: bool,
    ) -> Result<Self, PrismError>
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: BTreeSet<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        let detectors: BTreeSet<DetectorId> = detectors.into_iter().collect();

        if extensions.is_empty() {
            return Err(PrismError::Validation(
                "at least one file extension must be selected".to_string(),
            ));
        }
        if detectors.is_empty() {
            return Err(PrismError::Validation(
                "at least one detector must be selected".to_string(),
            ));
        }

        Ok(Self {
            extensions,
            detectors,
            fast_scan,
        })
    }

    /// Whether the file's extension is selected (case-insensitive).
    #[must_use]
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

/// A task submission.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Directory (or single file) to scan
    pub root_path: PathBuf,
    /// Scan parameters
    pub params: ScanParams,
}

/// A scan job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Directory (or single file) being scanned
    pub root_path: PathBuf,
    /// Scan parameters
    pub params: ScanParams,
    /// Current lifecycle state
    pub state: TaskState,
    /// When the task was submitted
    pub created_at: Timestamp,
    /// When the last search or resume started
    pub started_at: Option<Timestamp>,
    /// When the task last completed or stopped
    pub finished_at: Option<Timestamp>,
    /// Files seen during enumeration, eligible or not
    pub total_files: u64,
    /// Files with a selected extension (one `TaskFile` each)
    pub selected_files: u64,
    /// Files with at least one validated match
    pub found_files: u64,
}

/// One file unit of work within a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    /// Unique identifier
    pub id: FileId,
    /// Owning task
    pub task_id: TaskId,
    /// Absolute path of the file
    pub path: PathBuf,
    /// Size at enumeration time
    pub size_bytes: u64,
    /// Current state
    pub state: FileState,
}

/// Validated match count for one (file, detector) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// File the matches were found in
    pub file_id: FileId,
    /// Detector that produced them
    pub detector_id: DetectorId,
    /// Number of validated matches, always positive
    pub count: u32,
}

/// Aggregate file counts for a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Files selected for scanning
    pub selected: u64,
    /// Files waiting to be claimed
    pub pending: u64,
    /// Files claimed by a worker right now
    pub scanning: u64,
    /// Files scanned successfully
    pub completed: u64,
    /// Files whose scan failed
    pub failed: u64,
    /// Files left unclaimed by a stop
    pub stopped: u64,
    /// Files with at least one validated match
    pub found: u64,
}

impl TaskProgress {
    /// `scanned + failed == selected`.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.completed + self.failed == self.selected
    }

    /// Completion percentage (0.0 - 100.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.selected == 0 {
            return 100.0;
        }
        (self.completed + self.failed) as f64 * 100.0 / self.selected as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(id: &str) -> DetectorId {
        DetectorId::new(id).expect("valid detector ID")
    }

    #[test]
    fn test_forward_transitions() {
        assert!(TaskState::Loading.can_transition_to(TaskState::Pending));
        assert!(TaskState::Pending.can_transition_to(TaskState::Searching));
        assert!(TaskState::Searching.can_transition_to(TaskState::Scanning));
        assert!(TaskState::Scanning.can_transition_to(TaskState::Completed));
    }

    #[test]
    fn test_stop_only_from_active_states() {
        assert!(TaskState::Searching.can_transition_to(TaskState::Stopped));
        assert!(TaskState::Scanning.can_transition_to(TaskState::Stopped));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Stopped));
        assert!(!TaskState::Completed.can_transition_to(TaskState::Stopped));
    }

    #[test]
    fn test_stopped_never_completes_directly() {
        assert!(!TaskState::Stopped.can_transition_to(TaskState::Completed));
        assert!(TaskState::Stopped.can_transition_to(TaskState::Scanning));
        assert!(TaskState::Stopped.can_transition_to(TaskState::Searching));
        assert!(TaskState::Completed.can_transition_to(TaskState::Searching));
    }

    #[test]
    fn test_no_skipping_enumeration() {
        assert!(!TaskState::Pending.can_transition_to(TaskState::Scanning));
        assert!(!TaskState::Loading.can_transition_to(TaskState::Searching));
        assert!(!TaskState::Searching.can_transition_to(TaskState::Completed));
    }

    #[test]
    fn test_state_names_round_trip() {
        for state in [
            TaskState::Loading,
            TaskState::Pending,
            TaskState::Searching,
            TaskState::Scanning,
            TaskState::Completed,
            TaskState::Stopped,
        ] {
            assert_eq!(state.as_str().parse::<TaskState>().expect("parse"), state);
        }
        assert!("Running".parse::<TaskState>().is_err());
        assert_eq!("Failed".parse::<FileState>().expect("parse"), FileState::Failed);
    }

    #[test]
    fn test_file_state_terminal() {
        assert!(!FileState::Pending.is_terminal());
        assert!(!FileState::Scanning.is_terminal());
        assert!(FileState::Completed.is_terminal());
        assert!(FileState::Failed.is_terminal());
        assert!(FileState::Stopped.is_terminal());
    }

    #[test]
    fn test_scan_params_normalize_extensions() {
        let params = ScanParams::new([".TXT", "csv", " Log "], [detector("Email")], false)
            .expect("valid params");
        assert_eq!(
            params.extensions.iter().cloned().collect::<Vec<_>>(),
            vec!["csv", "log", "txt"]
        );
        assert!(params.matches_extension(Path::new("/data/report.Txt")));
        assert!(!params.matches_extension(Path::new("/data/photo.png")));
        assert!(!params.matches_extension(Path::new("/data/Makefile")));
    }

    #[test]
    fn test_scan_params_reject_empty_sets() {
        assert!(ScanParams::new(Vec::<String>::new(), [detector("Email")], false).is_err());
        assert!(ScanParams::new(["txt"], Vec::new(), false).is_err());
    }

    #[test]
    fn test_progress_drained() {
        let mut progress = TaskProgress {
            selected: 3,
            completed: 2,
            scanning: 1,
            ..TaskProgress::default()
        };
        assert!(!progress.is_drained());
        progress.scanning = 0;
        progress.failed = 1;
        assert!(progress.is_drained());
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
        assert!(TaskProgress::default().is_drained());
    }
}
