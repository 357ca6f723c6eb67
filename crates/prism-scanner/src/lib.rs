//! Prism Scanner - Task orchestration for sensitive-data discovery.
//!
//! This crate turns stored tasks into scanned files. A [`TaskManager`] walks
//! each task through its lifecycle, and a [`ScanScheduler`] runs a fixed pool
//! of [`ScanWorker`]s that pull work from the task store.
//!
//! # Features
//!
//! - Workers claim files atomically from the store; no central dispatcher
//! - Random task pick spreads workers across concurrently scanning tasks
//! - Idle workers deactivate and are relaunched when a task starts scanning
//! - Cooperative stop: unclaimed files are parked, in-flight files are cancelled
//! - Per-file failure containment: a bad file finishes FAILED, the loop goes on
//!
//! # Example
//!
//! ```rust,ignore
//! use prism_scanner::{ScanContext, ScanScheduler, TaskManager};
//! use std::sync::Arc;
//!
//! let ctx = Arc::new(ScanContext::new(store, registry, config));
//! let scheduler = Arc::new(ScanScheduler::new(Arc::clone(&ctx)));
//! let manager = TaskManager::new(ctx, scheduler);
//!
//! let task = manager.submit("/srv/share", params).await?;
//! manager.start(&task.id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod context;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod search;
pub mod tasks;
pub mod worker;

// Re-export commonly used types
pub use context::{ScanContext, TaskPlan};
pub use error::{Result, ScanError};
pub use events::{NoopEvents, ScanEvents};
pub use scheduler::ScanScheduler;
pub use search::{enumerate, Enumeration};
pub use tasks::TaskManager;
pub use worker::{Poll, ScanWorker};
