//! Task lifecycle: submission, enumeration, stop, resume, rescan and recovery.

use crate::context::ScanContext;
use crate::error::{Result, ScanError};
use crate::scheduler::ScanScheduler;
use crate::search;
use prism_core::{
    FileState, NewTask, ScanParams, ScanResult, Task, TaskFile, TaskId, TaskProgress, TaskState,
};
use prism_db::DatabaseError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Files inserted per store call during enumeration.
const INSERT_BATCH: usize = 512;

/// Drives tasks through their lifecycle and wakes the worker pool.
#[derive(Debug)]
pub struct TaskManager {
    ctx: Arc<ScanContext>,
    scheduler: Arc<ScanScheduler>,
}

impl TaskManager {
    /// Create a manager over a shared context and scheduler.
    #[must_use]
    pub fn new(ctx: Arc<ScanContext>, scheduler: Arc<ScanScheduler>) -> Self {
        Self { ctx, scheduler }
    }

    /// The worker pool this manager wakes.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<ScanScheduler> {
        &self.scheduler
    }

    /// Persist a new task in `Pending`.
    ///
    /// Every selected detector must be registered.
    pub async fn submit(&self, root_path: impl Into<PathBuf>, params: ScanParams) -> Result<Task> {
        self.ctx.registry().select(&params.detectors)?;
        let task = self
            .ctx
            .store()
            .create_task(&NewTask {
                root_path: root_path.into(),
                params,
            })
            .await?;
        info!(task_id = %task.id, root = %task.root_path.display(), "Task submitted");
        self.ctx.events().on_state_changed(&task.id, task.state);
        Ok(task)
    }

    /// Enumerate a pending task's files and hand it to the workers.
    pub async fn start(&self, task_id: &TaskId) -> Result<Task> {
        let task = self.require(task_id).await?;
        if task.state != TaskState::Pending {
            return Err(invalid(&task, "start"));
        }
        self.search(task).await
    }

    /// Stop a searching or scanning task.
    ///
    /// Unclaimed files are marked STOPPED and in-flight files are cancelled;
    /// returns once no file of the task is left in SCANNING. Files still
    /// in flight after `scanning.stop_timeout_ms` are marked STOPPED, and
    /// their late results are discarded.
    pub async fn stop(&self, task_id: &TaskId) -> Result<Task> {
        let task = self.require(task_id).await?;
        match task.state {
            TaskState::Stopped => return Ok(task),
            state if state.is_active() => {}
            _ => return Err(invalid(&task, "stop")),
        }

        let store = self.ctx.store();
        self.set_state(task_id, TaskState::Stopped).await?;
        let marked = store
            .mark_files(task_id, FileState::Pending, FileState::Stopped)
            .await?;
        self.ctx.cancel(task_id);
        info!(task_id = %task_id, marked, "Stopping task");

        let scanning = &self.ctx.config().scanning;
        let deadline = tokio::time::Instant::now() + scanning.stop_timeout();
        loop {
            let progress = store.progress(task_id).await?;
            if progress.scanning == 0 {
                self.ctx.events().on_progress(task_id, &progress);
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                let abandoned = store
                    .mark_files(task_id, FileState::Scanning, FileState::Stopped)
                    .await?;
                warn!(task_id = %task_id, abandoned, "In-flight files did not drain before the stop timeout");
                self.ctx.events().on_progress(task_id, &store.progress(task_id).await?);
                break;
            }
            tokio::time::sleep(scanning.stop_poll()).await;
        }
        self.require(task_id).await
    }

    /// Continue a stopped or completed task.
    ///
    /// STOPPED files become claimable again; FAILED files stay FAILED. A task
    /// stopped before its enumeration finished is enumerated from scratch.
    pub async fn resume(&self, task_id: &TaskId) -> Result<Task> {
        let task = self.require(task_id).await?;
        if !matches!(task.state, TaskState::Stopped | TaskState::Completed) {
            return Err(invalid(&task, "resume"));
        }

        let store = self.ctx.store();
        if task.selected_files == 0 && store.list_files(task_id).await?.is_empty() {
            return self.search(task).await;
        }

        let requeued = store
            .mark_files(task_id, FileState::Stopped, FileState::Pending)
            .await?;
        self.set_state(task_id, TaskState::Scanning).await?;
        info!(task_id = %task_id, requeued, "Task resumed");
        self.wake(task_id).await
    }

    /// Drop every file and result of a finished task and enumerate again.
    pub async fn rescan(&self, task_id: &TaskId) -> Result<Task> {
        let task = self.require(task_id).await?;
        if !matches!(task.state, TaskState::Stopped | TaskState::Completed) {
            return Err(invalid(&task, "rescan"));
        }
        let removed = self.ctx.store().reset_files(task_id).await?;
        info!(task_id = %task_id, removed, "Rescanning task");
        self.search(task).await
    }

    /// Delete a task, stopping it first if it is running.
    pub async fn delete(&self, task_id: &TaskId) -> Result<()> {
        let task = self.require(task_id).await?;
        if task.state.is_active() {
            self.stop(task_id).await?;
        }
        self.ctx.store().delete_task(task_id).await?;
        self.ctx.evict(task_id);
        info!(task_id = %task_id, "Task deleted");
        Ok(())
    }

    /// Repair state left behind by a process that died mid-work.
    ///
    /// Interrupted enumerations are restarted; the worker pool is woken if any
    /// task is scanning afterwards.
    pub async fn recover(&self) -> Result<()> {
        let store = self.ctx.store();
        let recovery = store.recover_interrupted().await?;

        for task_id in &recovery.interrupted_searches {
            self.set_state(task_id, TaskState::Stopped).await?;
            if let Err(e) = self.rescan(task_id).await {
                warn!(task_id = %task_id, error = %e, "Could not restart interrupted search");
            }
        }

        if !store.scanning_tasks().await?.is_empty() {
            self.scheduler.start().await;
        }
        Ok(())
    }

    /// Fetch one task.
    pub async fn task(&self, task_id: &TaskId) -> Result<Task> {
        self.require(task_id).await
    }

    /// All tasks, oldest first.
    pub async fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.ctx.store().list_tasks().await?)
    }

    /// File counts by state.
    pub async fn progress(&self, task_id: &TaskId) -> Result<TaskProgress> {
        Ok(self.ctx.store().progress(task_id).await?)
    }

    /// Files of a task.
    pub async fn files(&self, task_id: &TaskId) -> Result<Vec<TaskFile>> {
        Ok(self.ctx.store().list_files(task_id).await?)
    }

    /// Validated match counts of a task.
    pub async fn results(&self, task_id: &TaskId) -> Result<Vec<ScanResult>> {
        Ok(self.ctx.store().results_for_task(task_id).await?)
    }

    /// Poll until the task is neither searching nor scanning.
    pub async fn wait_until_settled(&self, task_id: &TaskId, poll: Duration) -> Result<Task> {
        loop {
            let task = self.require(task_id).await?;
            if !task.state.is_active() {
                return Ok(task);
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn search(&self, task: Task) -> Result<Task> {
        let store = self.ctx.store();
        let task_id = task.id.clone();
        self.set_state(&task_id, TaskState::Searching).await?;

        let cancel = self.ctx.cancel_token(&task_id);
        let events = Arc::clone(self.ctx.events());
        let (id, root, params) = (task_id.clone(), task.root_path.clone(), task.params.clone());
        let enumeration = tokio::task::spawn_blocking(move || {
            search::enumerate(&id, &root, &params, events.as_ref(), &cancel)
        })
        .await?;

        if enumeration.interrupted {
            info!(task_id = %task_id, "Enumeration interrupted by stop");
            return self.require(&task_id).await;
        }

        for batch in enumeration.files.chunks(INSERT_BATCH) {
            store.insert_files(batch).await?;
        }
        let selected = enumeration.files.len() as u64;
        store
            .set_enumeration_totals(&task_id, enumeration.total, selected)
            .await?;
        info!(
            task_id = %task_id,
            total = enumeration.total,
            selected,
            "Enumeration complete"
        );

        // Only a task still searching may start scanning; a stop that landed
        // during enumeration must stick.
        match store
            .transition_from(&task_id, TaskState::Searching, TaskState::Scanning)
            .await
        {
            Ok(_) => self.ctx.events().on_state_changed(&task_id, TaskState::Scanning),
            Err(DatabaseError::InvalidTransition { from, .. }) => {
                let parked = store
                    .mark_files(&task_id, FileState::Pending, FileState::Stopped)
                    .await?;
                info!(task_id = %task_id, state = %from, parked, "Task left searching during enumeration");
                return self.require(&task_id).await;
            }
            Err(e) => return Err(e.into()),
        }
        self.wake(&task_id).await
    }

    /// Start idle workers and settle tasks that have nothing to scan.
    async fn wake(&self, task_id: &TaskId) -> Result<Task> {
        self.scheduler.start().await;
        let store = self.ctx.store();
        if store.complete_if_drained(task_id).await? {
            self.ctx.evict(task_id);
            self.ctx.events().on_state_changed(task_id, TaskState::Completed);
        }
        self.require(task_id).await
    }

    async fn set_state(&self, task_id: &TaskId, to: TaskState) -> Result<Task> {
        let task = self.ctx.store().transition(task_id, to).await?;
        self.ctx.events().on_state_changed(task_id, to);
        Ok(task)
    }

    async fn require(&self, task_id: &TaskId) -> Result<Task> {
        self.ctx
            .store()
            .get_task(task_id)
            .await?
            .ok_or_else(|| ScanError::TaskNotFound(task_id.clone()))
    }
}

fn invalid(task: &Task, action: &'static str) -> ScanError {
    ScanError::InvalidState {
        task_id: task.id.clone(),
        state: task.state,
        action,
    }
}
