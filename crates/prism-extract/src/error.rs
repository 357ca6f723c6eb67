//! Extraction errors.
//!
//! These never cross the [`ContentExtractor`](crate::ContentExtractor)
//! boundary: the extractor turns them into a skipped document.

use prism_core::PrismError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while producing text samples from a file.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Opening or reading a file failed
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A container could not be opened or one of its entries is corrupt
    #[error("corrupt archive {}: {}", .path.display(), .source)]
    Archive {
        /// Archive being read
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// A size, ratio or nesting limit was hit
    #[error("{}: {}", .path.display(), .reason)]
    LimitExceeded {
        /// File or member that exceeded the limit
        path: PathBuf,
        /// Which limit
        reason: String,
    },
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn limit(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LimitExceeded {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl From<ExtractError> for PrismError {
    fn from(err: ExtractError) -> Self {
        PrismError::Extraction(err.to_string())
    }
}
