//! Validator algorithm families.
//!
//! Detectors compose these predicates instead of re-implementing them. Every
//! function here is total: malformed input yields `false` (or `None`), never a
//! panic. Composition order inside a detector is cheap filters first (length,
//! character class), then modular arithmetic, then the anti-fraud heuristics.
//!
//! - [`checksum`] - weighted mod-N sums, Luhn, mod-97, and the identifier checks built on them
//! - [`structural`] - calendar dates, dictionaries and fixed field layouts
//! - [`heuristics`] - rejection of synthetic-looking digit strings
//! - [`base58`] - base58check decoding for wallet addresses

pub mod base58;
pub mod checksum;
pub mod heuristics;
pub mod structural;

/// Decimal digit values of `s`, ignoring every non-digit character.
///
/// ```rust
/// use prism_detect::validators::digits;
///
/// assert_eq!(digits("41-1 1"), vec![4, 1, 1, 1]);
/// ```
#[must_use]
pub fn digits(s: &str) -> Vec<u8> {
    s.bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect()
}

/// Uppercase ASCII alphanumerics of `s`, dropping spaces and punctuation.
#[must_use]
pub fn compact_alnum(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
