//! Prism Extract - turning files into text samples.
//!
//! The [`ContentExtractor`] trait is the seam between the scan workers and
//! file formats. [`FsExtractor`] implements it for the local filesystem:
//!
//! - plain text is split into samples of whole lines (binary files are skipped)
//! - XML/HTML has its tags stripped
//! - zip archives and zip-based office documents are recursed into, each
//!   member materialized in a scratch directory that is always removed
//!
//! Fast scans cap the number of samples per top-level file through a
//! [`SampleBudget`]; a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is checked at every sample boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod archive;
pub mod error;
pub mod extractor;
pub mod format;
pub mod options;
pub mod sample;

pub use error::{ExtractError, Result};
pub use extractor::{ContentExtractor, FsExtractor};
pub use format::Format;
pub use options::{ExtractOptions, SampleBudget};
pub use sample::{is_probably_binary, strip_markup, SampleEnd};
