//! `prism` - command-line host for the Prism discovery engine.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use prism_core::{AppConfig, DetectorId, ScanParams, Task, TaskId, TaskProgress, TaskState};
use prism_db::Database;
use prism_detect::DetectorRegistry;
use prism_scanner::{ScanContext, ScanError, ScanEvents, ScanScheduler, TaskManager};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_EXTENSIONS: &[&str] = &[
    "txt", "csv", "log", "json", "xml", "html", "htm", "docx", "xlsx", "pptx", "odt", "ods",
    "zip",
];

const SETTLE_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "prism", version, about = "Find sensitive data in files")]
struct Cli {
    /// Task store location (overrides config and PRISM_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Number of scan workers (overrides config and PRISM_THREADS)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory (or a single file) and print per-file counts
    Scan {
        /// Directory or file to scan
        root: PathBuf,

        /// File extensions to scan, comma separated
        #[arg(long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,

        /// Detector IDs to enable, comma separated (default: all)
        #[arg(long = "detector", value_delimiter = ',')]
        detectors: Vec<String>,

        /// Sample files instead of reading them completely
        #[arg(long)]
        fast: bool,
    },
    /// List available detectors
    Detectors,
    /// List stored tasks
    Tasks,
    /// Continue a stopped or completed task
    Resume {
        /// Task ID
        id: String,
    },
    /// Drop a task's results and scan its root again
    Rescan {
        /// Task ID
        id: String,
    },
    /// Delete a task and its results
    Delete {
        /// Task ID
        id: String,
    },
    /// Print the effective configuration
    Config {
        /// Save it to the config file instead
        #[arg(long)]
        write: bool,
    },
}

/// Logs task state changes for the console.
struct ConsoleEvents;

impl ScanEvents for ConsoleEvents {
    fn on_state_changed(&self, task_id: &TaskId, state: TaskState) {
        info!(task_id = %task_id, state = %state, "Task state changed");
    }

    fn on_progress(&self, task_id: &TaskId, progress: &TaskProgress) {
        tracing::debug!(
            task_id = %task_id,
            completed = progress.completed,
            failed = progress.failed,
            selected = progress.selected,
            "Progress {:.1}%",
            progress.percent()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let registry = DetectorRegistry::builtin().context("build detector registry")?;
    if matches!(cli.command, Commands::Detectors) {
        for detector in registry.iter() {
            println!(
                "{:<18} {:<14} {}",
                detector.id().to_string(),
                detector.category().as_str(),
                detector.name()
            );
        }
        return Ok(());
    }

    let mut config = AppConfig::load_with_env().context("load configuration")?;
    if let Some(path) = cli.database {
        config.general.database_path = Some(path);
    }
    if let Some(threads) = cli.threads {
        config.scanning.threads = threads.max(1);
    }

    if let Commands::Config { write } = &cli.command {
        if *write {
            let path = config.save().context("write configuration")?;
            println!("wrote {}", path.display());
        } else {
            print!("{}", config.to_toml().context("render configuration")?);
        }
        return Ok(());
    }

    let db_path = config.database_path().context("resolve database path")?;
    let db = Database::open(&db_path, config.scanning.max_connections)
        .await
        .with_context(|| format!("open task store at {}", db_path.display()))?;
    info!(path = %db_path.display(), "Task store opened");

    let ctx = Arc::new(
        ScanContext::new(Arc::new(db), Arc::new(registry), config)
            .with_events(Arc::new(ConsoleEvents)),
    );
    let scheduler = Arc::new(ScanScheduler::new(Arc::clone(&ctx)));
    let manager = TaskManager::new(Arc::clone(&ctx), Arc::clone(&scheduler));
    manager.recover().await.context("recover interrupted tasks")?;

    let outcome = run(&cli.command, &manager, &ctx).await;
    scheduler.stop().await;
    outcome
}

async fn run(command: &Commands, manager: &TaskManager, ctx: &ScanContext) -> Result<()> {
    match command {
        Commands::Scan {
            root,
            extensions,
            detectors,
            fast,
        } => {
            let root = root
                .canonicalize()
                .with_context(|| format!("resolve {}", root.display()))?;
            let params = scan_params(ctx, extensions, detectors, *fast)?;
            let task = manager.submit(root, params).await?;
            println!("task {}", task.id);
            let task = settle(manager, &task.id, manager.start(&task.id)).await?;
            report(manager, &task).await
        }
        Commands::Detectors | Commands::Config { .. } => Ok(()),
        Commands::Tasks => {
            for task in manager.tasks().await? {
                println!(
                    "{}  {:<10} {:>6}/{:<6} found {:<6} {}",
                    task.id,
                    task.state.as_str(),
                    task.selected_files,
                    task.total_files,
                    task.found_files,
                    task.root_path.display()
                );
            }
            Ok(())
        }
        Commands::Resume { id } => {
            let task_id = parse_id(id)?;
            let task = settle(manager, &task_id, manager.resume(&task_id)).await?;
            report(manager, &task).await
        }
        Commands::Rescan { id } => {
            let task_id = parse_id(id)?;
            let task = settle(manager, &task_id, manager.rescan(&task_id)).await?;
            report(manager, &task).await
        }
        Commands::Delete { id } => {
            let task_id = parse_id(id)?;
            manager.delete(&task_id).await?;
            println!("deleted {task_id}");
            Ok(())
        }
    }
}

fn scan_params(
    ctx: &ScanContext,
    extensions: &[String],
    detectors: &[String],
    fast_scan: bool,
) -> Result<ScanParams> {
    let extensions: Vec<&str> = if extensions.is_empty() {
        DEFAULT_EXTENSIONS.to_vec()
    } else {
        extensions.iter().map(String::as_str).collect()
    };
    let detectors: Vec<DetectorId> = if detectors.is_empty() {
        ctx.registry().ids().cloned().collect()
    } else {
        detectors
            .iter()
            .map(|id| DetectorId::new(id.trim()))
            .collect::<prism_core::Result<_>>()
            .context("invalid detector ID")?
    };
    Ok(ScanParams::new(extensions, detectors, fast_scan)?)
}

/// Run `action` and wait for the task to settle; Ctrl-C stops it instead.
async fn settle<A>(manager: &TaskManager, task_id: &TaskId, action: A) -> Result<Task>
where
    A: Future<Output = Result<Task, ScanError>>,
{
    let work = async {
        action.await?;
        Ok::<_, anyhow::Error>(manager.wait_until_settled(task_id, SETTLE_POLL).await?)
    };
    until_interrupted(manager, task_id, work, tokio::signal::ctrl_c()).await
}

/// Drive `work` unless `interrupt` fires first, in which case the task is stopped.
///
/// Covers enumeration as well as scanning, so an interrupted task is never
/// left SEARCHING.
async fn until_interrupted<W, I>(
    manager: &TaskManager,
    task_id: &TaskId,
    work: W,
    interrupt: I,
) -> Result<Task>
where
    W: Future<Output = Result<Task>>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        biased;
        signal = interrupt => {
            signal.context("listen for Ctrl-C")?;
            warn!(task_id = %task_id, "Interrupted, stopping task");
            match manager.stop(task_id).await {
                Ok(task) => Ok(task),
                // Interrupted before the task left Pending
                Err(ScanError::InvalidState { .. }) => Ok(manager.task(task_id).await?),
                Err(e) => Err(e.into()),
            }
        }
        task = work => task,
    }
}

async fn report(manager: &TaskManager, task: &Task) -> Result<()> {
    let paths: HashMap<_, _> = manager
        .files(&task.id)
        .await?
        .into_iter()
        .map(|file| (file.id, file.path))
        .collect();

    let mut by_file: BTreeMap<PathBuf, Vec<(DetectorId, u32)>> = BTreeMap::new();
    for result in manager.results(&task.id).await? {
        if let Some(path) = paths.get(&result.file_id) {
            by_file
                .entry(path.clone())
                .or_default()
                .push((result.detector_id, result.count));
        }
    }

    for (path, counts) in &by_file {
        let counts: Vec<String> = counts.iter().map(|(id, n)| format!("{id}={n}")).collect();
        println!("{}  {}", path.display(), counts.join(" "));
    }

    let progress = manager.progress(&task.id).await?;
    println!(
        "{}: {} of {} files selected, {} scanned, {} failed, {} stopped, {} with findings",
        task.state,
        task.selected_files,
        task.total_files,
        progress.completed,
        progress.failed,
        progress.stopped,
        task.found_files
    );
    if task.state == TaskState::Stopped {
        println!("resume with: prism resume {}", task.id);
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<TaskId> {
    match TaskId::new(id.trim()) {
        Ok(task_id) => Ok(task_id),
        Err(e) => bail!("invalid task ID {id:?}: {e}"),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::ScanParams;
    use std::path::Path;
    use std::sync::{mpsc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    /// Holds enumeration at the first eligible file until released.
    struct Gate {
        entered: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ScanEvents for Gate {
        fn on_file_found(&self, _task_id: &TaskId, _path: &Path) {
            if let Some(entered) = self.entered.lock().expect("gate lock").take() {
                let _ = entered.send(());
                let _ = self.release.lock().expect("gate lock").recv();
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interrupt_during_enumeration_stops_task() {
        let tmp = TempDir::new().expect("create temp dir");
        std::fs::write(tmp.path().join("a.txt"), "mail a@example.com\n").expect("write");

        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Gate {
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };

        let db = Database::in_memory().await.expect("open database");
        let registry = DetectorRegistry::builtin().expect("builtin registry");
        let mut config = AppConfig::default();
        config.scanning.stop_poll_ms = 5;
        let ctx = Arc::new(
            ScanContext::new(Arc::new(db), Arc::new(registry), config)
                .with_events(Arc::new(gate)),
        );
        let scheduler = Arc::new(ScanScheduler::new(Arc::clone(&ctx)));
        let manager = TaskManager::new(ctx, Arc::clone(&scheduler));

        let params = ScanParams::new(
            ["txt"],
            [DetectorId::new("Email").expect("valid detector ID")],
            false,
        )
        .expect("valid params");
        let task = manager.submit(tmp.path(), params).await.expect("submit");

        // The interrupt arrives while enumeration is blocked on the gate
        let interrupt = async {
            entered_rx.await.expect("enumeration reached the file");
            Ok::<_, std::io::Error>(())
        };
        let work = async {
            manager.start(&task.id).await?;
            Ok::<_, anyhow::Error>(manager.wait_until_settled(&task.id, SETTLE_POLL).await?)
        };
        let stopped = until_interrupted(&manager, &task.id, work, interrupt)
            .await
            .expect("interrupted run");
        release_tx.send(()).expect("release enumeration");
        assert_eq!(stopped.state, TaskState::Stopped);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let task = manager.task(&task.id).await.expect("task");
        assert_eq!(task.state, TaskState::Stopped);

        let task = resume_and_settle(&manager, &task.id).await;
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.found_files, 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_interrupt_before_start_leaves_task_pending() {
        let db = Database::in_memory().await.expect("open database");
        let registry = DetectorRegistry::builtin().expect("builtin registry");
        let ctx = Arc::new(ScanContext::new(
            Arc::new(db),
            Arc::new(registry),
            AppConfig::default(),
        ));
        let scheduler = Arc::new(ScanScheduler::new(Arc::clone(&ctx)));
        let manager = TaskManager::new(ctx, scheduler);
        let params = ScanParams::new(
            ["txt"],
            [DetectorId::new("Email").expect("valid detector ID")],
            false,
        )
        .expect("valid params");
        let task = manager.submit("/data", params).await.expect("submit");

        let work = std::future::pending::<Result<Task>>();
        let task = until_interrupted(&manager, &task.id, work, async { Ok::<_, std::io::Error>(()) })
            .await
            .expect("interrupted run");
        assert_eq!(task.state, TaskState::Pending);
    }

    async fn resume_and_settle(manager: &TaskManager, task_id: &TaskId) -> Task {
        manager.resume(task_id).await.expect("resume");
        tokio::time::timeout(
            Duration::from_secs(20),
            manager.wait_until_settled(task_id, Duration::from_millis(10)),
        )
        .await
        .expect("task settles in time")
        .expect("task exists")
    }

    #[test]
    fn test_config_command_parses() {
        let cli = Cli::try_parse_from(["prism", "config", "--write"]).expect("parse");
        assert!(matches!(cli.command, Commands::Config { write: true }));
        let cli = Cli::try_parse_from(["prism", "--threads", "2", "config"]).expect("parse");
        assert!(matches!(cli.command, Commands::Config { write: false }));
        assert_eq!(cli.threads, Some(2));
    }
}
