//! Anti-fraud heuristics.
//!
//! Test data and placeholder values often pass a checksum by accident
//! (`0000000000000000` is Luhn-valid). These predicates flag strings that look
//! generated rather than issued. They operate on symbol slices: decimal digit
//! values from [`digits`](super::digits) or raw ASCII bytes.

use std::collections::BTreeSet;

/// Longest repeating period checked by [`is_repeating`].
pub const MAX_PERIOD: usize = 4;

/// Every symbol is identical (`"7777"`).
#[must_use]
pub fn all_same(s: &[u8]) -> bool {
    s.len() >= 2 && s.iter().all(|&c| c == s[0])
}

/// Digits increase by one at each step, wrapping 9 to 0 (`"7890123"`).
#[must_use]
pub fn is_ascending(digits: &[u8]) -> bool {
    digits.len() >= 4
        && digits.iter().all(|&d| d <= 9)
        && digits.windows(2).all(|w| (w[0] + 1) % 10 == w[1])
}

/// Digits decrease by one at each step, wrapping 0 to 9 (`"3210987"`).
#[must_use]
pub fn is_descending(digits: &[u8]) -> bool {
    digits.len() >= 4
        && digits.iter().all(|&d| d <= 9)
        && digits.windows(2).all(|w| (w[0] + 9) % 10 == w[1])
}

/// `s` is at least two repetitions of its first `period` symbols.
#[must_use]
pub fn has_period(s: &[u8], period: usize) -> bool {
    period > 0 && s.len() >= period * 2 && (period..s.len()).all(|i| s[i] == s[i - period])
}

/// `s` repeats with some period in `1..=MAX_PERIOD` (`"121212"`, `"123123"`).
#[must_use]
pub fn is_repeating(s: &[u8]) -> bool {
    (1..=MAX_PERIOD).any(|p| has_period(s, p))
}

/// `s` reads the same in both directions (`"12344321"`).
#[must_use]
pub fn is_palindrome(s: &[u8]) -> bool {
    s.len() >= 4 && s.iter().eq(s.iter().rev())
}

/// Two symbols alternating in runs of equal length (`"1010"`, `"112211221122"`).
#[must_use]
pub fn is_alternating(s: &[u8]) -> bool {
    if s.len() < 4 {
        return false;
    }
    let symbols: BTreeSet<u8> = s.iter().copied().collect();
    if symbols.len() != 2 {
        return false;
    }
    let runs = run_lengths(s);
    runs.len() >= 2 && runs.iter().all(|&r| r == runs[0])
}

/// Fewer than `max_unique` distinct symbols, all within `max_spread` of each other.
#[must_use]
pub fn low_diversity(s: &[u8], max_unique: usize, max_spread: u8) -> bool {
    let symbols: BTreeSet<u8> = s.iter().copied().collect();
    match (symbols.first(), symbols.last()) {
        (Some(&min), Some(&max)) => symbols.len() < max_unique && max - min <= max_spread,
        _ => false,
    }
}

/// Any of the heuristics above fires.
///
/// ```rust
/// use prism_detect::validators::{digits, heuristics::looks_synthetic};
///
/// assert!(looks_synthetic(&digits("0000000000000000")));
/// assert!(looks_synthetic(&digits("1234567890123456")));
/// assert!(!looks_synthetic(&digits("4111111111111111")));
/// ```
#[must_use]
pub fn looks_synthetic(s: &[u8]) -> bool {
    all_same(s)
        || is_ascending(s)
        || is_descending(s)
        || is_repeating(s)
        || is_palindrome(s)
        || is_alternating(s)
        || low_diversity(s, 3, 2)
}

fn run_lengths(s: &[u8]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut iter = s.iter().peekable();
    while let Some(&c) = iter.next() {
        let mut len = 1;
        while iter.peek() == Some(&&c) {
            iter.next();
            len += 1;
        }
        runs.push(len);
    }
    runs
}
