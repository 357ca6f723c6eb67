//! Detector registry.
//!
//! The registry is built once at startup and shared read-only. A scan selects
//! a subset of it by [`DetectorId`] and compiles that subset into a
//! [`MatchEngine`].

use crate::builtin::builtin_detectors;
use crate::detector::Detector;
use crate::engine::{Backend, MatchEngine};
use crate::error::{DetectError, Result};
use prism_core::DetectorId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Immutable set of registered detectors keyed by ID.
#[derive(Debug, Clone, Default)]
pub struct DetectorRegistry {
    detectors: BTreeMap<DetectorId, Arc<Detector>>,
}

impl DetectorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalogue.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for detector in builtin_detectors()? {
            registry.register(detector)?;
        }
        debug!("Registered {} built-in detectors", registry.len());
        Ok(registry)
    }

    /// Add a detector. IDs must be unique.
    pub fn register(&mut self, detector: Detector) -> Result<()> {
        if self.detectors.contains_key(detector.id()) {
            return Err(DetectError::DuplicateDetector(detector.id().to_string()));
        }
        self.detectors
            .insert(detector.id().clone(), Arc::new(detector));
        Ok(())
    }

    /// Look up a detector.
    #[must_use]
    pub fn get(&self, id: &DetectorId) -> Option<&Arc<Detector>> {
        self.detectors.get(id)
    }

    /// Resolve a selection of IDs, failing on the first unknown one.
    pub fn select(&self, ids: &BTreeSet<DetectorId>) -> Result<Vec<Arc<Detector>>> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| DetectError::UnknownDetector(id.to_string()))
            })
            .collect()
    }

    /// Compile a match engine for a selection of IDs.
    pub fn engine(&self, ids: &BTreeSet<DetectorId>, backend: Backend) -> Result<MatchEngine> {
        MatchEngine::new(self.select(ids)?, backend)
    }

    /// All registered IDs in order.
    pub fn ids(&self) -> impl Iterator<Item = &DetectorId> {
        self.detectors.keys()
    }

    /// All registered detectors in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Detector>> {
        self.detectors.values()
    }

    /// Number of registered detectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}
