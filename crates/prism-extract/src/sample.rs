//! Splitting a byte stream into text samples.
//!
//! Samples are groups of whole lines of roughly `sample_len` bytes. A line
//! longer than twice that is cut at the last separator so numbers are rarely
//! split across two samples.

use crate::options::Sampler;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::{self, BufRead, Read};
use tokio_util::sync::CancellationToken;

/// Bytes inspected to decide whether a stream is text.
pub const SNIFF_LEN: usize = 8 * 1024;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Tag regex is hardcoded and valid"));

static ENTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#x([0-9A-Fa-f]{1,6})|#([0-9]{1,7})|(amp|lt|gt|quot|apos|nbsp));")
        .expect("Entity regex is hardcoded and valid")
});

/// How sample bytes are turned into matchable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// Plain text, used as-is
    Plain,
    /// XML/HTML: tags become spaces and entities are decoded
    Xml,
}

impl Markup {
    fn is_boundary(self, b: u8) -> bool {
        match self {
            Self::Plain => matches!(b, b' ' | b'\t' | b'\n'),
            Self::Xml => b == b'>',
        }
    }
}

/// Why sampling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEnd {
    /// The whole stream was sampled
    Eof,
    /// The fast-scan budget ran out
    BudgetExhausted,
    /// The cancellation token fired
    Cancelled,
    /// The stream does not look like text; nothing was sampled
    Binary,
}

/// Heuristic binary detection on the head of a stream.
///
/// Any NUL byte, or more than 10% control bytes, means binary. Bytes above
/// 0x7F count as text so UTF-8 and legacy 8-bit encodings pass.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn is_probably_binary(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return false;
    }
    if buf.contains(&0) {
        return true;
    }
    let printable = buf
        .iter()
        .filter(|&&b| matches!(b, 0x09 | 0x0A | 0x0C | 0x0D) || (0x20..=0x7E).contains(&b) || b >= 0x80)
        .count();
    (printable as f64 / buf.len() as f64) < 0.9
}

/// Replace tags with spaces and decode character entities.
#[must_use]
pub fn strip_markup(s: &str) -> String {
    let untagged = TAG_PATTERN.replace_all(s, " ");
    ENTITY_PATTERN
        .replace_all(&untagged, |caps: &Captures| {
            let code = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse().ok()
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("amp") => Some(u32::from('&')),
                    Some("lt") => Some(u32::from('<')),
                    Some("gt") => Some(u32::from('>')),
                    Some("quot") => Some(u32::from('"')),
                    Some("apos") => Some(u32::from('\'')),
                    _ => Some(0xA0),
                }
            };
            code.and_then(char::from_u32)
                .map_or_else(|| " ".to_string(), String::from)
        })
        .into_owned()
}

/// Feed `reader` to `on_sample` one sample at a time.
///
/// The budget and the cancellation token are checked before every sample, so
/// a cancelled scan finishes the sample in hand and then stops.
pub(crate) fn read_samples<R, F>(
    mut reader: R,
    markup: Markup,
    sample_len: usize,
    sampler: &mut Sampler,
    cancel: &CancellationToken,
    mut on_sample: F,
) -> io::Result<SampleEnd>
where
    R: BufRead,
    F: FnMut(&str),
{
    let head = reader.fill_buf()?;
    if is_probably_binary(&head[..head.len().min(SNIFF_LEN)]) {
        return Ok(SampleEnd::Binary);
    }

    let sample_len = sample_len.max(1);
    let hard_cap = sample_len.saturating_mul(2);
    let mut buf: Vec<u8> = Vec::with_capacity(hard_cap);

    loop {
        let room = hard_cap.saturating_sub(buf.len()).max(1);
        let read = reader
            .by_ref()
            .take(room as u64)
            .read_until(b'\n', &mut buf)?;

        if read == 0 {
            if !buf.is_empty() {
                if let Some(end) = emit(&buf, markup, sampler, cancel, &mut on_sample) {
                    return Ok(end);
                }
            }
            return Ok(SampleEnd::Eof);
        }

        if buf.len() < sample_len {
            continue;
        }

        let cut = if buf.ends_with(b"\n") {
            buf.len()
        } else {
            match buf.iter().rposition(|&b| markup.is_boundary(b)) {
                Some(pos) if pos > 0 => pos + 1,
                _ => buf.len(),
            }
        };
        if let Some(end) = emit(&buf[..cut], markup, sampler, cancel, &mut on_sample) {
            return Ok(end);
        }
        buf.drain(..cut);
    }
}

fn emit<F: FnMut(&str)>(
    bytes: &[u8],
    markup: Markup,
    sampler: &mut Sampler,
    cancel: &CancellationToken,
    on_sample: &mut F,
) -> Option<SampleEnd> {
    if cancel.is_cancelled() {
        return Some(SampleEnd::Cancelled);
    }
    if !sampler.take() {
        return Some(SampleEnd::BudgetExhausted);
    }
    let text = String::from_utf8_lossy(bytes);
    match markup {
        Markup::Plain => on_sample(&text),
        Markup::Xml => on_sample(&strip_markup(&text)),
    }
    None
}
