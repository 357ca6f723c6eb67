//! Prism Detect - content inspection for the Prism discovery engine.
//!
//! Text extracted from a file flows through three steps:
//!
//! 1. [`normalize`] folds encoding artifacts into plain ASCII separators.
//! 2. [`MatchEngine`] runs the coarse patterns of the enabled [`Detector`]s
//!    and yields candidate spans.
//! 3. Each candidate goes through its detector's validator (built from the
//!    [`validators`] families); survivors are tallied into a [`Document`].
//!
//! # Example
//!
//! ```rust
//! use prism_core::DetectorId;
//! use prism_detect::{Backend, DetectorRegistry, Document};
//! use std::collections::BTreeSet;
//!
//! let registry = DetectorRegistry::builtin().unwrap();
//! let ids: BTreeSet<DetectorId> = ["CardNumber", "Phone"]
//!     .into_iter()
//!     .map(|id| DetectorId::new(id).unwrap())
//!     .collect();
//! let engine = registry.engine(&ids, Backend::Standard).unwrap();
//!
//! let mut doc = Document::new("/tmp/note.txt", 46);
//! engine.scan_sample("card 4111 1111 1111 1111 tel +7 912 345 67 89", &mut doc);
//! assert_eq!(doc.field_count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod builtin;
pub mod detector;
pub mod document;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod pattern;
pub mod registry;
pub mod validators;

pub use detector::{Category, Detector, ValidateFn};
pub use document::Document;
pub use engine::{Backend, Candidate, MatchEngine};
pub use error::{DetectError, Result};
pub use normalize::normalize;
pub use pattern::Pattern;
pub use registry::DetectorRegistry;
