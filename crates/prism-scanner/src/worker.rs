//! A scan worker: claims one file at a time from a random scanning task.

use crate::context::{ScanContext, TaskPlan};
use crate::error::Result;
use prism_core::{FileState, ScanResult, TaskFile, TaskId, TaskState};
use prism_detect::Document;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const FINISH_ATTEMPTS: u32 = 3;

/// What one poll of the queue did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// No task is scanning
    Idle,
    /// A task is scanning but had nothing left to claim
    Empty,
    /// A file was claimed and finished
    Scanned,
}

/// One member of the worker pool.
pub struct ScanWorker {
    id: usize,
    ctx: Arc<ScanContext>,
}

impl ScanWorker {
    /// Create worker number `id`.
    #[must_use]
    pub fn new(id: usize, ctx: Arc<ScanContext>) -> Self {
        Self { id, ctx }
    }

    /// Run until `shutdown` fires or the worker has been idle too long.
    ///
    /// Only polls that find no scanning task count towards deactivation.
    pub async fn run(self, shutdown: CancellationToken) {
        let limit = self.ctx.config().scanning.idle_poll_limit;
        let sleep = self.ctx.config().scanning.idle_sleep();
        let mut idle = 0u32;
        debug!(worker = self.id, "Worker started");

        while !shutdown.is_cancelled() {
            let poll = match self.poll_once().await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!(worker = self.id, error = %e, "Queue poll failed");
                    Poll::Empty
                }
            };

            match poll {
                Poll::Scanned => {
                    idle = 0;
                    continue;
                }
                Poll::Idle => {
                    idle += 1;
                    if idle >= limit {
                        info!(worker = self.id, polls = idle, "No scanning tasks, worker deactivating");
                        return;
                    }
                }
                Poll::Empty => idle = 0,
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(sleep) => {}
            }
        }
        debug!(worker = self.id, "Worker stopped");
    }

    /// Claim and scan at most one file.
    pub async fn poll_once(&self) -> Result<Poll> {
        let store = self.ctx.store();
        let scanning = store.scanning_tasks().await?;
        let task_id = {
            let mut rng = rand::thread_rng();
            scanning.choose(&mut rng).cloned()
        };
        let Some(task_id) = task_id else {
            return Ok(Poll::Idle);
        };

        let Some(file) = store.claim_file(&task_id).await? else {
            self.refresh(&task_id).await?;
            return Ok(Poll::Empty);
        };
        // Claims only succeed on a scanning task, so this is the current run's token
        let cancel = self.ctx.cancel_token(&task_id);

        let plan = match self.ctx.plan(&task_id).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(worker = self.id, task_id = %task_id, error = %e, "Cannot build scan plan");
                let mut document = Document::new(&file.path, file.size_bytes);
                document.skip();
                self.finish(file, FileState::Failed, &document).await?;
                self.refresh(&task_id).await?;
                return Ok(Poll::Scanned);
            }
        };

        let document = self.extract(&file, plan, cancel.clone()).await;
        if cancel.is_cancelled() && self.resumed(&task_id).await? {
            // Stopped and resumed mid-file: the partial scan is discarded
            if store.release_file(&file.id).await? {
                debug!(worker = self.id, path = %file.path.display(), "File requeued after resume");
            }
            return Ok(Poll::Scanned);
        }
        let state = if cancel.is_cancelled() {
            FileState::Stopped
        } else if document.is_skipped() {
            FileState::Failed
        } else {
            FileState::Completed
        };

        self.finish(file, state, &document).await?;
        self.refresh(&task_id).await?;
        Ok(Poll::Scanned)
    }

    async fn extract(&self, file: &TaskFile, plan: Arc<TaskPlan>, cancel: CancellationToken) -> Document {
        let extractor = Arc::clone(self.ctx.extractor());
        let path = file.path.clone();
        let options = plan.options.clone().with_cancel(cancel);

        let job = tokio::task::spawn_blocking(move || extractor.scan(&path, &plan.engine, &options));
        match job.await {
            Ok(document) => document,
            Err(e) => {
                error!(worker = self.id, path = %file.path.display(), error = %e, "Extraction panicked");
                let mut document = Document::new(&file.path, file.size_bytes);
                document.skip();
                document
            }
        }
    }

    async fn finish(&self, mut file: TaskFile, state: FileState, document: &Document) -> Result<()> {
        let results: Vec<ScanResult> = if state == FileState::Completed {
            document
                .counts()
                .iter()
                .map(|(detector_id, &count)| ScanResult {
                    file_id: file.id.clone(),
                    detector_id: detector_id.clone(),
                    count,
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut attempt = 1;
        let recorded = loop {
            match self.ctx.store().finish_file(&file.id, state, &results).await {
                Ok(recorded) => break recorded,
                Err(e) if attempt < FINISH_ATTEMPTS => {
                    warn!(worker = self.id, path = %file.path.display(), attempt, error = %e, "Retrying file finish");
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(e) => {
                    // Hand the claim back so a stop does not wait on it
                    if let Err(release) = self.ctx.store().release_file(&file.id).await {
                        warn!(worker = self.id, path = %file.path.display(), error = %release, "Cannot requeue file");
                    }
                    return Err(e.into());
                }
            }
        };

        if !recorded {
            debug!(worker = self.id, path = %file.path.display(), "File no longer claimed, result dropped");
            return Ok(());
        }

        debug!(
            worker = self.id,
            task_id = %file.task_id,
            path = %file.path.display(),
            state = %state,
            fields = results.len(),
            "File scanned"
        );
        file.state = state;
        self.ctx.events().on_file_scanned(&file.task_id, &file, document);
        Ok(())
    }

    async fn resumed(&self, task_id: &TaskId) -> Result<bool> {
        let task = self.ctx.store().get_task(task_id).await?;
        Ok(task.is_some_and(|task| task.state == TaskState::Scanning))
    }

    async fn refresh(&self, task_id: &TaskId) -> Result<()> {
        let store = self.ctx.store();
        let progress = store.progress(task_id).await?;
        self.ctx.events().on_progress(task_id, &progress);

        if progress.is_drained() && store.complete_if_drained(task_id).await? {
            self.ctx.evict(task_id);
            self.ctx.events().on_state_changed(task_id, TaskState::Completed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ScanWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanWorker").field("id", &self.id).finish_non_exhaustive()
    }
}
