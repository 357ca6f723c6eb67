//! The content extractor seam and its filesystem implementation.

use crate::archive::MemberContext;
use crate::error::{ExtractError, Result};
use crate::format::Format;
use crate::options::{ExtractOptions, Sampler};
use crate::sample::{read_samples, Markup, SampleEnd, SNIFF_LEN};
use prism_detect::{Document, MatchEngine};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Produces a [`Document`] for one file.
///
/// Implementations never fail: unreadable or corrupt input yields a skipped
/// document. They honor the sample budget and cancellation token in
/// `options`, and recurse into containers, merging member documents.
pub trait ContentExtractor: Send + Sync {
    /// Scan one file with the given engine.
    fn scan(&self, path: &Path, engine: &MatchEngine, options: &ExtractOptions) -> Document;
}

/// Extractor for files on the local filesystem.
///
/// Handles plain text, XML/HTML, zip archives and zip-based office documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExtractor;

impl FsExtractor {
    /// Create an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scan a file at container depth `depth` (top-level files are depth 0).
    pub(crate) fn scan_path(
        &self,
        path: &Path,
        depth: u8,
        engine: &MatchEngine,
        options: &ExtractOptions,
        sampler: &mut Sampler,
    ) -> Result<Document> {
        let size = fs::metadata(path)
            .map_err(|e| ExtractError::io(path, e))?
            .len();
        if size > options.max_file_size {
            return Err(ExtractError::limit(
                path,
                format!("{size} bytes exceeds the {} byte limit", options.max_file_size),
            ));
        }

        let format = Format::detect(path);
        match format {
            Format::Text => self.scan_text(path, size, Markup::Plain, engine, options, sampler),
            Format::Markup => self.scan_text(path, size, Markup::Xml, engine, options, sampler),
            Format::Zip | Format::OfficeXml => {
                let ctx = MemberContext {
                    format,
                    depth,
                    engine,
                    options,
                };
                self.scan_zip(path, size, &ctx, sampler)
            }
        }
    }

    fn scan_text(
        &self,
        path: &Path,
        size: u64,
        markup: Markup,
        engine: &MatchEngine,
        options: &ExtractOptions,
        sampler: &mut Sampler,
    ) -> Result<Document> {
        let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        let reader = BufReader::with_capacity(SNIFF_LEN, file);
        let mut document = Document::new(path, size);

        let end = read_samples(
            reader,
            markup,
            options.budget.sample_len,
            sampler,
            &options.cancel,
            |sample| engine.scan_sample(sample, &mut document),
        )
        .map_err(|e| ExtractError::io(path, e))?;

        match end {
            SampleEnd::Binary => {
                debug!(path = %path.display(), "Not a text file, skipping");
                document.skip();
            }
            SampleEnd::BudgetExhausted => {
                debug!(path = %path.display(), samples = sampler.taken(), "Sample budget exhausted");
            }
            SampleEnd::Cancelled => {
                debug!(path = %path.display(), "Scan cancelled mid-file");
            }
            SampleEnd::Eof => {}
        }
        Ok(document)
    }
}

impl ContentExtractor for FsExtractor {
    fn scan(&self, path: &Path, engine: &MatchEngine, options: &ExtractOptions) -> Document {
        let mut sampler = options.budget.start();
        match self.scan_path(path, 0, engine, options, &mut sampler) {
            Ok(document) => {
                debug!(
                    path = %path.display(),
                    fields = document.field_count(),
                    skipped = document.is_skipped(),
                    "Extracted file"
                );
                document
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Extraction failed");
                let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let mut document = Document::new(path, size);
                document.skip();
                document
            }
        }
    }
}
