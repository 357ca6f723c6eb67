//! Error types for detector registration and match-engine construction.
//!
//! Matching itself never fails: validators are total predicates and a rejected
//! candidate is simply discarded. Errors only arise while building detectors.

use prism_core::PrismError;
use thiserror::Error;

/// Errors raised while building detectors, registries or engines.
#[derive(Error, Debug)]
pub enum DetectError {
    /// A coarse pattern failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern source text
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// The combined pattern set failed to compile
    #[error("failed to compile pattern set: {0}")]
    PatternSet(#[source] regex::Error),

    /// The literal prefilter automaton failed to build
    #[error("failed to build prefilter: {0}")]
    Prefilter(#[from] aho_corasick::BuildError),

    /// A detector was requested that is not registered
    #[error("unknown detector: {0}")]
    UnknownDetector(String),

    /// A detector with the same ID is already registered
    #[error("detector already registered: {0}")]
    DuplicateDetector(String),

    /// A detector was declared without any coarse pattern
    #[error("detector {0} has no patterns")]
    NoPatterns(String),

    /// Invalid identifier or other core validation error
    #[error(transparent)]
    Core(#[from] PrismError),
}

/// Result type alias for detector operations.
pub type Result<T> = std::result::Result<T, DetectError>;

impl From<DetectError> for PrismError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Core(inner) => inner,
            other => PrismError::Detector(other.to_string()),
        }
    }
}
