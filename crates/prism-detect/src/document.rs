//! Per-file match accumulator.
//!
//! A [`Document`] is created when a worker starts on a file, receives one
//! [`accumulate`](Document::accumulate) call per detector per sample, and is
//! frozen once the file's scan ends. Container files merge the documents of
//! their members.

use prism_core::DetectorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Validated match counts for one file.
///
/// `counts` never holds a zero entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    path: PathBuf,
    size_bytes: u64,
    counts: BTreeMap<DetectorId, u32>,
    skipped: bool,
}

impl Document {
    /// A fresh, unskipped document.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            counts: BTreeMap::new(),
            skipped: false,
        }
    }

    /// An empty container document.
    ///
    /// It starts out skipped so that it stays skipped only if every merged
    /// member was skipped; merging it into anything is a no-op.
    #[must_use]
    pub fn container(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            skipped: true,
            ..Self::new(path, size_bytes)
        }
    }

    /// Add `n` matches for `detector`. Zero is ignored.
    pub fn accumulate(&mut self, detector: &DetectorId, n: u32) {
        if n == 0 {
            return;
        }
        let count = self.counts.entry(detector.clone()).or_insert(0);
        *count = count.saturating_add(n);
    }

    /// Fold another document into this one.
    ///
    /// Counts add up field-wise; the result is skipped only if both were.
    pub fn merge(&mut self, other: Document) {
        for (detector, n) in other.counts {
            self.accumulate(&detector, n);
        }
        self.skipped = self.skipped && other.skipped;
    }

    /// Mark the document as unreadable.
    pub fn skip(&mut self) {
        self.skipped = true;
    }

    /// Whether the file could not be read.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// No validated match at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of detectors with at least one match.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.counts.len()
    }

    /// Matches recorded for one detector.
    #[must_use]
    pub fn count(&self, detector: &DetectorId) -> u32 {
        self.counts.get(detector).copied().unwrap_or(0)
    }

    /// All non-zero counts in detector order.
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<DetectorId, u32> {
        &self.counts
    }

    /// Path of the scanned file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the scanned file.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}
