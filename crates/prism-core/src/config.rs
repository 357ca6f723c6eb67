//! Configuration management for Prism.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/prism/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Worker pool settings
    pub scanning: ScanningConfig,
    /// Sampling budget used by tasks with the fast-scan flag
    pub fast_scan: FastScanConfig,
    /// Container recursion limits
    pub archives: ArchiveConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// it does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PRISM_THREADS`: Override the worker count
    /// - `PRISM_DATABASE`: Override the task store location
    /// - `PRISM_FAST_SCAN_SAMPLES`: Override the fast-scan sample budget
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Unparseable values are ignored and leave the configured value in place.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PRISM_THREADS") {
            if let Ok(threads) = val.parse() {
                self.scanning.threads = threads;
                tracing::debug!("Override scanning.threads from env: {}", threads);
            }
        }

        if let Some(val) = lookup("PRISM_DATABASE") {
            tracing::debug!("Override general.database_path from env: {}", val);
            self.general.database_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("PRISM_FAST_SCAN_SAMPLES") {
            if let Ok(samples) = val.parse() {
                self.fast_scan.max_samples = samples;
                tracing::debug!("Override fast_scan.max_samples from env: {}", samples);
            }
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scanning.threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scanning.idle_poll_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.idle_poll_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fast_scan.sample_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fast_scan.sample_len".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to a specific file, creating its directory.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        fs::write(config_path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/prism/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "prism", "prism").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/prism`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "prism", "prism").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the task store location, defaulting to `<data_dir>/prism.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.general.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("prism.db")),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Task store location; `None` means the platform data directory
    pub database_path: Option<PathBuf>,
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Number of concurrent scan workers
    pub threads: usize,
    /// Consecutive empty polls before a worker deactivates itself
    pub idle_poll_limit: u32,
    /// Sleep between empty polls in milliseconds
    pub idle_sleep_ms: u64,
    /// Poll interval used while a stopping task drains in-flight files
    pub stop_poll_ms: u64,
    /// How long a stop waits for in-flight files before marking them STOPPED
    pub stop_timeout_ms: u64,
    /// Files larger than this are recorded but never extracted
    pub max_file_size: u64,
    /// Maximum connections in the task store pool
    pub max_connections: u32,
}

impl ScanningConfig {
    /// Idle sleep as a `Duration`.
    #[must_use]
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    /// Stop poll interval as a `Duration`.
    #[must_use]
    pub fn stop_poll(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms)
    }

    /// Stop drain timeout as a `Duration`.
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            idle_poll_limit: 50,
            idle_sleep_ms: 200,
            stop_poll_ms: 100,
            stop_timeout_ms: 30_000,
            max_file_size: 512 * 1024 * 1024, // 512 MB
            max_connections: 1,
        }
    }
}

/// Sampling budget for fast scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FastScanConfig {
    /// Maximum number of text samples taken from one file
    pub max_samples: usize,
    /// Target length of one text sample in bytes
    pub sample_len: usize,
}

impl Default for FastScanConfig {
    fn default() -> Self {
        Self {
            max_samples: 16,
            sample_len: 64 * 1024,
        }
    }
}

/// Container recursion limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Maximum nesting depth for archives inside archives
    pub max_depth: u8,
    /// Maximum number of entries visited per archive
    pub max_entries: usize,
    /// Members larger than this (uncompressed) are skipped
    pub max_member_size: u64,
    /// Members whose uncompressed/compressed ratio exceeds this are skipped
    pub max_compression_ratio: f64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_entries: 10_000,
            max_member_size: 100 * 1024 * 1024, // 100 MB
            max_compression_ratio: 100.0,
        }
    }
}
