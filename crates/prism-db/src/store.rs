//! The task store seam used by the scan engine.

use crate::error::Result;
use crate::{scan_results, task_files, tasks, Database};
use async_trait::async_trait;
use prism_core::{
    FileId, FileState, NewTask, ScanResult, Task, TaskFile, TaskId, TaskProgress, TaskState,
};

/// What crash recovery changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Files found mid-scan and returned to `Pending`
    pub requeued_files: u64,
    /// Tasks found in `Loading` and promoted to `Pending`
    pub promoted_tasks: u64,
    /// Tasks whose enumeration was interrupted and must be searched again
    pub interrupted_searches: Vec<TaskId>,
}

/// Durable queue of tasks, their files and scan results.
///
/// `claim_file` is the only operation that must be atomic against concurrent
/// callers; everything else is either append-only or guarded on the current
/// state.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task; it comes back in `Pending`.
    async fn create_task(&self, task: &NewTask) -> Result<Task>;

    /// Fetch one task.
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>>;

    /// All tasks, oldest first.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Delete a task and everything it owns. Returns `false` if it did not exist.
    async fn delete_task(&self, id: &TaskId) -> Result<bool>;

    /// Apply a legal state transition.
    async fn transition(&self, id: &TaskId, to: TaskState) -> Result<Task>;

    /// Apply a transition only if the task is still in `from`.
    async fn transition_from(&self, id: &TaskId, from: TaskState, to: TaskState) -> Result<Task>;

    /// Move a `Scanning` task with every file finished to `Completed`.
    async fn complete_if_drained(&self, id: &TaskId) -> Result<bool>;

    /// IDs of tasks currently in `Scanning`.
    async fn scanning_tasks(&self) -> Result<Vec<TaskId>>;

    /// Insert enumerated files.
    async fn insert_files(&self, files: &[TaskFile]) -> Result<u64>;

    /// Record how many files enumeration saw and selected.
    async fn set_enumeration_totals(&self, id: &TaskId, total: u64, selected: u64) -> Result<()>;

    /// Delete all files of a task and zero its counters.
    async fn reset_files(&self, id: &TaskId) -> Result<u64>;

    /// Atomically claim one pending file of a scanning task.
    async fn claim_file(&self, id: &TaskId) -> Result<Option<TaskFile>>;

    /// Record a claimed file's terminal state and results.
    async fn finish_file(
        &self,
        file: &FileId,
        state: FileState,
        results: &[ScanResult],
    ) -> Result<bool>;

    /// Return a claimed file to `Pending`. Returns `false` if it was not `Scanning`.
    async fn release_file(&self, file: &FileId) -> Result<bool>;

    /// Move all files of a task from one state to another.
    async fn mark_files(&self, id: &TaskId, from: FileState, to: FileState) -> Result<u64>;

    /// File counts by state.
    async fn progress(&self, id: &TaskId) -> Result<TaskProgress>;

    /// Files of a task.
    async fn list_files(&self, id: &TaskId) -> Result<Vec<TaskFile>>;

    /// Results of a task.
    async fn results_for_task(&self, id: &TaskId) -> Result<Vec<ScanResult>>;

    /// Undo the effects of a process that died mid-work.
    async fn recover_interrupted(&self) -> Result<Recovery>;
}

#[async_trait]
impl TaskStore for Database {
    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        tasks::create_task(self.pool(), task).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        tasks::get_task(self.pool(), id).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        tasks::list_tasks(self.pool()).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<bool> {
        tasks::delete_task(self.pool(), id).await
    }

    async fn transition(&self, id: &TaskId, to: TaskState) -> Result<Task> {
        tasks::transition(self.pool(), id, to).await
    }

    async fn transition_from(&self, id: &TaskId, from: TaskState, to: TaskState) -> Result<Task> {
        tasks::transition_from(self.pool(), id, from, to).await
    }

    async fn complete_if_drained(&self, id: &TaskId) -> Result<bool> {
        tasks::complete_if_drained(self.pool(), id).await
    }

    async fn scanning_tasks(&self) -> Result<Vec<TaskId>> {
        tasks::tasks_in_state(self.pool(), TaskState::Scanning).await
    }

    async fn insert_files(&self, files: &[TaskFile]) -> Result<u64> {
        task_files::insert_files(self.pool(), files).await
    }

    async fn set_enumeration_totals(&self, id: &TaskId, total: u64, selected: u64) -> Result<()> {
        tasks::set_enumeration_totals(self.pool(), id, total, selected).await
    }

    async fn reset_files(&self, id: &TaskId) -> Result<u64> {
        task_files::reset_files(self.pool(), id).await
    }

    async fn claim_file(&self, id: &TaskId) -> Result<Option<TaskFile>> {
        task_files::claim_file(self.pool(), id).await
    }

    async fn finish_file(
        &self,
        file: &FileId,
        state: FileState,
        results: &[ScanResult],
    ) -> Result<bool> {
        scan_results::finish_file(self.pool(), file, state, results).await
    }

    async fn release_file(&self, file: &FileId) -> Result<bool> {
        task_files::release_file(self.pool(), file).await
    }

    async fn mark_files(&self, id: &TaskId, from: FileState, to: FileState) -> Result<u64> {
        task_files::mark_files(self.pool(), id, from, to).await
    }

    async fn progress(&self, id: &TaskId) -> Result<TaskProgress> {
        task_files::progress(self.pool(), id).await
    }

    async fn list_files(&self, id: &TaskId) -> Result<Vec<TaskFile>> {
        task_files::list_files(self.pool(), id).await
    }

    async fn results_for_task(&self, id: &TaskId) -> Result<Vec<ScanResult>> {
        scan_results::results_for_task(self.pool(), id).await
    }

    async fn recover_interrupted(&self) -> Result<Recovery> {
        let requeued_files = task_files::requeue_interrupted(self.pool()).await?;

        let loading = tasks::tasks_in_state(self.pool(), TaskState::Loading).await?;
        for id in &loading {
            tasks::transition(self.pool(), id, TaskState::Pending).await?;
        }

        let recovery = Recovery {
            requeued_files,
            promoted_tasks: loading.len() as u64,
            interrupted_searches: tasks::tasks_in_state(self.pool(), TaskState::Searching).await?,
        };
        if recovery != Recovery::default() {
            tracing::warn!(
                requeued_files = recovery.requeued_files,
                promoted_tasks = recovery.promoted_tasks,
                interrupted_searches = recovery.interrupted_searches.len(),
                "Recovered interrupted work"
            );
        }
        Ok(recovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{DetectorId, ScanParams};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn new_task() -> NewTask {
        NewTask {
            root_path: PathBuf::from("/data"),
            params: ScanParams::new(
                ["txt"],
                [DetectorId::new("Email").expect("valid detector ID")],
                false,
            )
            .expect("valid params"),
        }
    }

    #[tokio::test]
    async fn test_store_as_trait_object() {
        let store: Arc<dyn TaskStore> =
            Arc::new(Database::in_memory().await.expect("open database"));
        let task = store.create_task(&new_task()).await.expect("create task");

        assert_eq!(store.list_tasks().await.expect("list").len(), 1);
        assert!(store.scanning_tasks().await.expect("scanning").is_empty());
        assert!(store.delete_task(&task.id).await.expect("delete"));
        assert!(store.get_task(&task.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_recover_interrupted() {
        let db = Database::in_memory().await.expect("open database");
        let searching = db.create_task(&new_task()).await.expect("create");
        db.transition(&searching.id, TaskState::Searching)
            .await
            .expect("search");

        sqlx::query(
            "INSERT INTO tasks (id, root_path, extensions, detectors, fast_scan, state, created_at)
             VALUES (?, '/crashed', '[\"txt\"]', '[\"Email\"]', 0, 'Loading', ?)",
        )
        .bind(TaskId::generate().as_str())
        .bind(prism_core::Timestamp::now().to_rfc3339())
        .execute(db.pool())
        .await
        .expect("insert loading task");

        let recovery = db.recover_interrupted().await.expect("recover");
        assert_eq!(recovery.promoted_tasks, 1);
        assert_eq!(recovery.requeued_files, 0);
        assert_eq!(recovery.interrupted_searches, vec![searching.id]);

        let again = db.recover_interrupted().await.expect("recover again");
        assert_eq!(again.promoted_tasks, 0);
    }
}
