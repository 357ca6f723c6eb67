//! Prism Core - Foundation crate for the Prism sensitive-data discovery engine.
//!
//! This crate provides shared types, error handling, configuration management,
//! and the scan task state machine that all other Prism crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`DetectorId`, `TaskId`, `FileId`, `Timestamp`)
//! - [`task`] - Task and task-file models with their lifecycle states
//!
//! # Example
//!
//! ```rust
//! use prism_core::{AppConfig, TaskState};
//!
//! let config = AppConfig::default();
//! assert!(config.scanning.threads > 0);
//!
//! assert!(TaskState::Scanning.can_transition_to(TaskState::Stopped));
//! assert!(!TaskState::Stopped.can_transition_to(TaskState::Completed));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod task;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, ArchiveConfig, FastScanConfig, GeneralConfig, ScanningConfig};
pub use error::{ConfigError, ConfigResult, PrismError, Result};
pub use task::{
    FileState, NewTask, ScanParams, ScanResult, Task, TaskFile, TaskProgress, TaskState,
};
pub use types::{DetectorId, FileId, TaskId, Timestamp};
