//! State shared by the task manager and every worker.

use crate::error::{Result, ScanError};
use crate::events::{NoopEvents, ScanEvents};
use prism_core::{AppConfig, TaskId};
use prism_db::TaskStore;
use prism_detect::{Backend, DetectorRegistry, MatchEngine};
use prism_extract::{ContentExtractor, ExtractOptions, FsExtractor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Everything needed to scan files of one task.
#[derive(Debug)]
pub struct TaskPlan {
    /// Engine over the task's selected detectors
    pub engine: MatchEngine,
    /// Extraction options for the task's fast-scan flag
    pub options: ExtractOptions,
}

/// Collaborators and caches shared across the scan engine.
pub struct ScanContext {
    store: Arc<dyn TaskStore>,
    registry: Arc<DetectorRegistry>,
    extractor: Arc<dyn ContentExtractor>,
    events: Arc<dyn ScanEvents>,
    config: AppConfig,
    backend: Backend,
    plans: Mutex<HashMap<TaskId, Arc<TaskPlan>>>,
    cancels: Mutex<HashMap<TaskId, CancellationToken>>,
}

impl ScanContext {
    /// Context with the filesystem extractor and no event observer.
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        registry: Arc<DetectorRegistry>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            registry,
            extractor: Arc::new(FsExtractor::new()),
            events: Arc::new(NoopEvents),
            config,
            backend: Backend::default(),
            plans: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the event observer.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn ScanEvents>) -> Self {
        self.events = events;
        self
    }

    /// Replace the content extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Choose the matching backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// The task store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// The detector registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    /// The content extractor.
    #[must_use]
    pub fn extractor(&self) -> &Arc<dyn ContentExtractor> {
        &self.extractor
    }

    /// The event observer.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn ScanEvents> {
        &self.events
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Plan for a task, built on first use and cached until evicted.
    pub async fn plan(&self, task_id: &TaskId) -> Result<Arc<TaskPlan>> {
        if let Some(plan) = self.lock_plans().get(task_id) {
            return Ok(Arc::clone(plan));
        }

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| ScanError::TaskNotFound(task_id.clone()))?;
        let plan = Arc::new(TaskPlan {
            engine: self.registry.engine(&task.params.detectors, self.backend)?,
            options: ExtractOptions::from_config(&self.config, task.params.fast_scan),
        });

        Ok(Arc::clone(
            self.lock_plans()
                .entry(task_id.clone())
                .or_insert(plan),
        ))
    }

    /// Cancellation token for a task's in-flight work.
    #[must_use]
    pub fn cancel_token(&self, task_id: &TaskId) -> CancellationToken {
        self.lock_cancels()
            .entry(task_id.clone())
            .or_default()
            .clone()
    }

    /// Cancel a task's in-flight work. Later calls to `cancel_token` get a fresh token.
    pub fn cancel(&self, task_id: &TaskId) {
        if let Some(token) = self.lock_cancels().remove(task_id) {
            token.cancel();
        }
    }

    /// Drop cached state for a task.
    pub fn evict(&self, task_id: &TaskId) {
        self.lock_plans().remove(task_id);
        self.lock_cancels().remove(task_id);
    }

    fn lock_plans(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, Arc<TaskPlan>>> {
        self.plans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cancels(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, CancellationToken>> {
        self.cancels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("detectors", &self.registry.len())
            .field("backend", &self.backend)
            .field("threads", &self.config.scanning.threads)
            .finish_non_exhaustive()
    }
}
