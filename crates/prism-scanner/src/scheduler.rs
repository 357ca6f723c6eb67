//! Fixed-size pool of scan workers.

use crate::context::ScanContext;
use crate::worker::ScanWorker;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct Pool {
    threads: usize,
    shutdown: CancellationToken,
    workers: Vec<Option<JoinHandle<()>>>,
}

/// Owns `N` worker slots and (re)starts workers into them.
///
/// Workers deactivate themselves when idle; calling [`start`](Self::start)
/// again relaunches any slot whose worker has exited.
pub struct ScanScheduler {
    ctx: Arc<ScanContext>,
    pool: Mutex<Pool>,
}

impl ScanScheduler {
    /// Scheduler sized from the configured thread count. No worker runs yet.
    #[must_use]
    pub fn new(ctx: Arc<ScanContext>) -> Self {
        let threads = ctx.config().scanning.threads.max(1);
        Self {
            ctx,
            pool: Mutex::new(Pool {
                threads,
                shutdown: CancellationToken::new(),
                workers: Vec::new(),
            }),
        }
    }

    /// Launch a worker in every empty or finished slot.
    ///
    /// Returns how many workers were launched.
    pub async fn start(&self) -> usize {
        let mut pool = self.pool.lock().await;
        let threads = pool.threads;
        pool.workers.resize_with(threads, || None);

        let mut launched = 0;
        for id in 0..threads {
            let running = pool.workers[id]
                .as_ref()
                .is_some_and(|handle| !handle.is_finished());
            if running {
                continue;
            }
            let worker = ScanWorker::new(id, Arc::clone(&self.ctx));
            let shutdown = pool.shutdown.clone();
            pool.workers[id] = Some(tokio::spawn(worker.run(shutdown)));
            launched += 1;
        }

        if launched > 0 {
            info!(launched, threads, "Scan workers started");
        }
        launched
    }

    /// Signal every worker and wait for all of them to exit.
    ///
    /// A worker finishes the file it holds before it observes the signal.
    pub async fn stop(&self) {
        let mut pool = self.pool.lock().await;
        pool.shutdown.cancel();
        for handle in pool.workers.iter_mut().filter_map(Option::take) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scan worker ended abnormally");
            }
        }
        pool.shutdown = CancellationToken::new();
        info!("Scan workers stopped");
    }

    /// Stop the pool, change its size, and start it again.
    pub async fn resize(&self, threads: usize) -> usize {
        self.stop().await;
        {
            let mut pool = self.pool.lock().await;
            pool.threads = threads.max(1);
            pool.workers.clear();
        }
        self.start().await
    }

    /// Configured number of worker slots.
    pub async fn threads(&self) -> usize {
        self.pool.lock().await.threads
    }

    /// Workers currently running.
    pub async fn active_workers(&self) -> usize {
        self.pool
            .lock()
            .await
            .workers
            .iter()
            .flatten()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl std::fmt::Debug for ScanScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanScheduler").finish_non_exhaustive()
    }
}
