//! Per-scan extraction options and the fast-scan sample budget.

use prism_core::{AppConfig, ArchiveConfig, FastScanConfig};
use tokio_util::sync::CancellationToken;

/// How much text is matched per top-level file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBudget {
    /// Target sample length in bytes
    pub sample_len: usize,
    /// Samples taken per top-level file; `None` reads the whole file
    pub max_samples: Option<usize>,
}

impl SampleBudget {
    /// Read everything, in samples of about `sample_len` bytes.
    #[must_use]
    pub fn unlimited(sample_len: usize) -> Self {
        Self {
            sample_len: sample_len.max(1),
            max_samples: None,
        }
    }

    /// The configured fast-scan budget.
    #[must_use]
    pub fn fast(config: &FastScanConfig) -> Self {
        Self {
            sample_len: config.sample_len.max(1),
            max_samples: Some(config.max_samples),
        }
    }

    pub(crate) fn start(self) -> Sampler {
        Sampler {
            max: self.max_samples,
            taken: 0,
        }
    }
}

/// Running sample count for one top-level file, shared by its archive members.
#[derive(Debug)]
pub(crate) struct Sampler {
    max: Option<usize>,
    taken: usize,
}

impl Sampler {
    /// Reserve one sample; `false` once the budget is spent.
    pub(crate) fn take(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.taken += 1;
        true
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.max.is_some_and(|max| self.taken >= max)
    }

    pub(crate) fn taken(&self) -> usize {
        self.taken
    }
}

/// Everything an extractor needs besides the file and the engine.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Sampling budget
    pub budget: SampleBudget,
    /// Container recursion limits
    pub archives: ArchiveConfig,
    /// Files larger than this are skipped
    pub max_file_size: u64,
    /// Checked at sample boundaries
    pub cancel: CancellationToken,
}

impl ExtractOptions {
    /// Options for a task, choosing the budget from its fast-scan flag.
    #[must_use]
    pub fn from_config(config: &AppConfig, fast_scan: bool) -> Self {
        let budget = if fast_scan {
            SampleBudget::fast(&config.fast_scan)
        } else {
            SampleBudget::unlimited(config.fast_scan.sample_len)
        };
        Self {
            budget,
            archives: config.archives.clone(),
            max_file_size: config.scanning.max_file_size,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the scan was asked to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), false)
    }
}
