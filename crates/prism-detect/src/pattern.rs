//! Coarse patterns.
//!
//! A [`Pattern`] is a recall-oriented regular expression plus an optional list
//! of literal anchors. Anchors are substrings that every match of the pattern
//! must contain (compared ASCII case-insensitively); the prefiltered engine
//! backend uses them to skip patterns whose anchors are absent from a sample.

use crate::error::{DetectError, Result};
use regex::Regex;

/// One coarse pattern of a detector.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    anchors: Vec<String>,
}

impl Pattern {
    /// Compile a pattern without anchors.
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(source).map_err(|source_err| DetectError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        })?;
        Ok(Self {
            regex,
            anchors: Vec::new(),
        })
    }

    /// Compile a pattern whose every match contains one of `anchors`.
    pub fn with_anchors(source: &str, anchors: &[&str]) -> Result<Self> {
        let mut pattern = Self::new(source)?;
        pattern.anchors = anchors
            .iter()
            .filter(|a| !a.is_empty())
            .map(|a| (*a).to_string())
            .collect();
        Ok(pattern)
    }

    /// Pattern source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Compiled regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Literal anchors, empty when the pattern has none.
    #[must_use]
    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    /// Whether the prefilter can gate this pattern.
    #[must_use]
    pub fn is_anchored(&self) -> bool {
        !self.anchors.is_empty()
    }
}
