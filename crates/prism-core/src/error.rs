//! Error taxonomy shared by the Prism crates.
//!
//! Each crate keeps its own error enum and converts into [`PrismError`] at
//! its public boundary.

use thiserror::Error;

/// Top-level error for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task store errors (connection, queries, migrations)
    #[error("store error: {0}")]
    Store(String),

    /// Detector errors (registration, unknown identifiers)
    #[error("detector error: {0}")]
    Detector(String),

    /// Content extraction errors (unreadable or corrupt files)
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Illegal task state transition
    #[error("invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task being transitioned
        task_id: String,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform has no home or config directory
    #[error("no config directory available on this platform")]
    NoConfigDir,

    /// Config file is not valid TOML for `AppConfig`
    #[error("malformed config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Config could not be written back as TOML
    #[error("cannot encode config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Config file could not be read or written
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value the engine cannot run with
    #[error("{field} {reason}")]
    InvalidValue {
        /// Dotted path of the offending key
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result alias over [`PrismError`].
pub type Result<T> = std::result::Result<T, PrismError>;

/// Result alias over [`ConfigError`].
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
