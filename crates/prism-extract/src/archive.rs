//! Zip container recursion.
//!
//! Each accepted member is copied into a scratch directory owned by the
//! current archive and scanned through [`FsExtractor::scan_path`] one level
//! deeper. The scratch directory is removed when the scan of the archive
//! returns, whether it succeeded or not.

use crate::error::{ExtractError, Result};
use crate::extractor::FsExtractor;
use crate::format::Format;
use crate::options::{ExtractOptions, Sampler};
use prism_detect::{Document, MatchEngine};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Shared state for one container scan.
pub(crate) struct MemberContext<'a> {
    pub(crate) format: Format,
    pub(crate) depth: u8,
    pub(crate) engine: &'a MatchEngine,
    pub(crate) options: &'a ExtractOptions,
}

/// Uncompressed/compressed ratio of an entry, `0.0` when nothing is compressed.
#[allow(clippy::cast_precision_loss)]
fn compression_ratio(compressed: u64, uncompressed: u64) -> f64 {
    if compressed == 0 {
        return 0.0;
    }
    uncompressed as f64 / compressed as f64
}

impl FsExtractor {
    pub(crate) fn scan_zip(
        &self,
        path: &Path,
        size: u64,
        ctx: &MemberContext<'_>,
        sampler: &mut Sampler,
    ) -> Result<Document> {
        let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::archive(path, e))?;
        let scratch = TempDir::new().map_err(|e| ExtractError::io(path, e))?;

        let limits = &ctx.options.archives;
        let entries = archive.len();
        if entries > limits.max_entries {
            warn!(
                path = %path.display(),
                entries,
                limit = limits.max_entries,
                "Archive has too many entries, scanning the first ones only"
            );
        }

        let mut container = Document::container(path, size);
        let mut members = 0usize;

        for index in 0..entries.min(limits.max_entries) {
            if ctx.options.is_cancelled() || sampler.exhausted() {
                break;
            }

            let member = match extract_member(&mut archive, index, path, scratch.path(), ctx) {
                Ok(Some(member)) => member,
                Ok(None) => continue,
                Err(e) => {
                    debug!(path = %path.display(), index, error = %e, "Skipping archive member");
                    members += 1;
                    let mut skipped = Document::new(path, 0);
                    skipped.skip();
                    container.merge(skipped);
                    continue;
                }
            };
            members += 1;

            let document = self
                .scan_path(&member, ctx.depth + 1, ctx.engine, ctx.options, sampler)
                .unwrap_or_else(|e| {
                    debug!(path = %path.display(), index, error = %e, "Archive member unreadable");
                    let mut skipped = Document::new(&member, 0);
                    skipped.skip();
                    skipped
                });
            container.merge(document);

            if let Err(e) = fs::remove_file(&member) {
                debug!(path = %member.display(), error = %e, "Failed to remove scratch file");
            }
        }

        if members == 0 {
            return Ok(Document::new(path, size));
        }
        Ok(container)
    }
}

/// Copy entry `index` into `scratch`.
///
/// Returns `None` for directories and members the container format ignores.
fn extract_member(
    archive: &mut ZipArchive<File>,
    index: usize,
    archive_path: &Path,
    scratch: &Path,
    ctx: &MemberContext<'_>,
) -> Result<Option<PathBuf>> {
    let limits = &ctx.options.archives;
    let mut entry = archive
        .by_index(index)
        .map_err(|e| ExtractError::archive(archive_path, e))?;

    if entry.is_dir() || !ctx.format.accepts_member(entry.name()) {
        return Ok(None);
    }

    let name = entry.name().to_string();
    let member_path = archive_path.join(&name);
    if entry.size() > limits.max_member_size {
        return Err(ExtractError::limit(
            member_path,
            format!("{} bytes exceeds the member size limit", entry.size()),
        ));
    }
    let ratio = compression_ratio(entry.compressed_size(), entry.size());
    if ratio > limits.max_compression_ratio {
        return Err(ExtractError::limit(
            member_path,
            format!("compression ratio {ratio:.0} exceeds {}", limits.max_compression_ratio),
        ));
    }

    let ext = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if Format::from_extension(ext.as_deref()).is_container() && ctx.depth >= limits.max_depth {
        return Err(ExtractError::limit(member_path, "archive nesting too deep"));
    }

    // Scratch names never come from the archive, only the extension does
    let target = match &ext {
        Some(ext) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            scratch.join(format!("{index}.{ext}"))
        }
        _ => scratch.join(index.to_string()),
    };
    let mut out = File::create(&target).map_err(|e| ExtractError::io(&target, e))?;
    let copied = io::copy(&mut entry.by_ref().take(limits.max_member_size + 1), &mut out)
        .map_err(|e| ExtractError::io(&member_path, e))?;
    if copied > limits.max_member_size {
        return Err(ExtractError::limit(
            member_path,
            "member larger than its header claims",
        ));
    }
    Ok(Some(target))
}
