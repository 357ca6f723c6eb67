//! Weighted modular checksums.
//!
//! All functions take digit *values* (`0..=9`) as produced by
//! [`digits`](super::digits), or an already compacted alphanumeric string for
//! the mod-97 family where letters map to `A=10 .. Z=35`.

/// `sum(weights[i] * digits[i])` over the shorter of the two slices.
#[must_use]
pub fn weighted_sum(digits: &[u8], weights: &[u32]) -> u32 {
    digits
        .iter()
        .zip(weights)
        .map(|(&d, &w)| u32::from(d) * w)
        .sum()
}

/// `weighted_sum(digits, weights) mod modulus`.
#[must_use]
pub fn weighted_mod(digits: &[u8], weights: &[u32], modulus: u32) -> u32 {
    if modulus == 0 {
        return 0;
    }
    weighted_sum(digits, weights) % modulus
}

/// Remainder of the decimal number spelled by `digits` modulo `modulus`.
#[must_use]
pub fn number_mod(digits: &[u8], modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    digits
        .iter()
        .fold(0u64, |rem, &d| (rem * 10 + u64::from(d)) % modulus)
}

/// Luhn (mod-10 with doubling) over the full number including its check digit.
///
/// ```rust
/// use prism_detect::validators::{checksum::luhn, digits};
///
/// assert!(luhn(&digits("4111 1111 1111 1111")));
/// assert!(!luhn(&digits("4111 1111 1111 1112")));
/// ```
#[must_use]
pub fn luhn(digits: &[u8]) -> bool {
    if digits.len() < 2 || digits.iter().any(|&d| d > 9) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Alphanumeric mod-97 remainder (`0-9` keep their value, `A=10 .. Z=35`).
///
/// Returns `None` for any character outside `[0-9A-Z]`.
#[must_use]
pub fn mod97(s: &str) -> Option<u32> {
    let mut rem: u32 = 0;
    for c in s.chars() {
        let value = c.to_digit(36)?;
        if c.is_ascii_lowercase() {
            return None;
        }
        rem = if value >= 10 {
            (rem * 100 + value) % 97
        } else {
            (rem * 10 + value) % 97
        };
    }
    Some(rem)
}

/// IBAN check: move the first four characters to the end, then mod-97 must be 1.
#[must_use]
pub fn iban_checksum(iban: &str) -> bool {
    if iban.len() < 5 || !iban.is_ascii() {
        return false;
    }
    let (head, tail) = iban.split_at(4);
    let rearranged = format!("{tail}{head}");
    mod97(&rearranged) == Some(1)
}

/// ISO 17442 LEI check: 20 characters whose mod-97 remainder is 1.
#[must_use]
pub fn lei_checksum(lei: &str) -> bool {
    lei.len() == 20 && mod97(lei) == Some(1)
}

const INN10_WEIGHTS: [u32; 9] = [2, 4, 10, 3, 5, 9, 4, 6, 8];
const INN12_WEIGHTS_1: [u32; 10] = [7, 2, 4, 10, 3, 5, 9, 4, 6, 8];
const INN12_WEIGHTS_2: [u32; 11] = [3, 7, 2, 4, 10, 3, 5, 9, 4, 6, 8];

/// Russian taxpayer number: one key for 10 digits, two keys for 12 digits.
///
/// Each key is `(weighted sum mod 11) mod 10`.
#[must_use]
pub fn inn_checksum(digits: &[u8]) -> bool {
    let key = |body: &[u8], weights: &[u32]| weighted_mod(body, weights, 11) % 10;
    match digits.len() {
        10 => key(&digits[..9], &INN10_WEIGHTS) == u32::from(digits[9]),
        12 => {
            key(&digits[..10], &INN12_WEIGHTS_1) == u32::from(digits[10])
                && key(&digits[..11], &INN12_WEIGHTS_2) == u32::from(digits[11])
        }
        _ => false,
    }
}

/// Russian state registration number: 13 digits (mod 11) or 15 digits (mod 13).
///
/// The check digit is the body's remainder reduced mod 10.
#[must_use]
pub fn ogrn_checksum(digits: &[u8]) -> bool {
    let (body_len, modulus) = match digits.len() {
        13 => (12, 11),
        15 => (14, 13),
        _ => return false,
    };
    let expected = number_mod(&digits[..body_len], modulus) % 10;
    expected == u64::from(digits[body_len])
}

/// Russian pension insurance number: nine body digits weighted 9..1, mod 101.
///
/// Sums below 100 are the check pair itself; 100 and 101 map to `00`.
#[must_use]
pub fn snils_checksum(digits: &[u8]) -> bool {
    const WEIGHTS: [u32; 9] = [9, 8, 7, 6, 5, 4, 3, 2, 1];
    if digits.len() != 11 {
        return false;
    }
    let sum = weighted_sum(&digits[..9], &WEIGHTS);
    let expected = match sum {
        0..=99 => sum,
        100 | 101 => 0,
        _ => {
            let rem = sum % 101;
            if rem == 100 {
                0
            } else {
                rem
            }
        }
    };
    expected == u32::from(digits[9]) * 10 + u32::from(digits[10])
}

const VIN_WEIGHTS: [u32; 17] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

fn vin_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        'A' | 'J' => Some(1),
        'B' | 'K' | 'S' => Some(2),
        'C' | 'L' | 'T' => Some(3),
        'D' | 'M' | 'U' => Some(4),
        'E' | 'N' | 'V' => Some(5),
        'F' | 'W' => Some(6),
        'G' | 'P' | 'X' => Some(7),
        'H' | 'Y' => Some(8),
        'R' | 'Z' => Some(9),
        _ => None,
    }
}

/// ISO 3779 VIN check digit (position 9, `X` standing for 10).
///
/// `I`, `O` and `Q` never appear in a VIN and fail the check.
#[must_use]
pub fn vin_checksum(vin: &str) -> bool {
    let chars: Vec<char> = vin.chars().collect();
    if chars.len() != 17 {
        return false;
    }
    let mut sum = 0u32;
    for (c, w) in chars.iter().zip(VIN_WEIGHTS) {
        match vin_value(*c) {
            Some(v) => sum += v * w,
            None => return false,
        }
    }
    let expected = match sum % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('?'),
    };
    chars[8] == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::digits;

    /// Every single-digit substitution of `valid` must fail `check`.
    fn assert_digit_mutations_fail(valid: &str, check: impl Fn(&str) -> bool) {
        assert_digit_mutations_fail_except(valid, check, |_| false);
    }

    /// Like [`assert_digit_mutations_fail`], skipping mutations for which
    /// `tolerated` holds.
    fn assert_digit_mutations_fail_except(
        valid: &str,
        check: impl Fn(&str) -> bool,
        tolerated: impl Fn(&str) -> bool,
    ) {
        assert!(check(valid), "{valid} should be valid");
        for (i, c) in valid.char_indices() {
            if !c.is_ascii_digit() {
                continue;
            }
            for replacement in '0'..='9' {
                if replacement == c {
                    continue;
                }
                let mut mutated = valid.to_string();
                mutated.replace_range(i..=i, &replacement.to_string());
                if tolerated(&mutated) {
                    continue;
                }
                assert!(!check(&mutated), "mutation {mutated} of {valid} passed");
            }
        }
    }

    #[test]
    fn test_weighted_mod() {
        assert_eq!(weighted_sum(&[1, 2, 3], &[3, 2, 1]), 10);
        assert_eq!(weighted_mod(&[1, 2, 3], &[3, 2, 1], 7), 3);
        assert_eq!(weighted_mod(&[1, 2, 3], &[3, 2, 1], 0), 0);
        assert_eq!(number_mod(&[1, 2, 3, 4], 97), 1234 % 97);
    }

    #[test]
    fn test_luhn_known_valid() {
        for card in [
            "4111111111111111",
            "5500000000000004",
            "4539578763621486",
            "378282246310005",
            "2200000000000004",
            "6011111111111117",
        ] {
            assert!(luhn(&digits(card)), "{card}");
        }
    }

    #[test]
    fn test_luhn_single_digit_mutations() {
        assert_digit_mutations_fail("4539578763621486", |s| luhn(&digits(s)));
        assert_digit_mutations_fail("378282246310005", |s| luhn(&digits(s)));
    }

    #[test]
    fn test_luhn_rejects_short_input() {
        assert!(!luhn(&[0]));
        assert!(!luhn(&[]));
    }

    #[test]
    fn test_mod97_mapping() {
        assert_eq!(mod97("A"), Some(10));
        assert_eq!(mod97("Z"), Some(35));
        assert_eq!(mod97("100"), Some(3));
        assert_eq!(mod97("a1"), None);
        assert_eq!(mod97("1-2"), None);
    }

    #[test]
    fn test_iban_known_valid() {
        for iban in [
            "GB82WEST12345698765432",
            "DE89370400440532013000",
            "FR1420041010050500013M02606",
            "RU0204452560040702810412345678901",
        ] {
            assert!(iban_checksum(iban), "{iban}");
        }
        assert!(!iban_checksum("GB82WEST12345698765433"));
        assert!(!iban_checksum("GB8"));
    }

    #[test]
    fn test_iban_single_digit_mutations() {
        assert_digit_mutations_fail("DE89370400440532013000", iban_checksum);
    }

    #[test]
    fn test_lei() {
        assert!(lei_checksum("5493001KJTIIGC8Y1R12"));
        assert!(lei_checksum("529900T8BM49AURSDO55"));
        assert!(!lei_checksum("5493001KJTIIGC8Y1R13"));
        assert!(!lei_checksum("5493001KJTIIGC8Y1R1"));
        assert_digit_mutations_fail("529900T8BM49AURSDO55", lei_checksum);
    }

    #[test]
    fn test_inn() {
        assert!(inn_checksum(&digits("7707083893")));
        assert!(inn_checksum(&digits("7830002293")));
        assert!(inn_checksum(&digits("500100732259")));
        assert!(!inn_checksum(&digits("7707083894")));
        assert!(!inn_checksum(&digits("500100732258")));
        assert!(!inn_checksum(&digits("77070838")));
    }

    /// INN keys before the final `mod 10`; a key of 10 collapses onto 0.
    fn inn_collapses(s: &str) -> bool {
        let d = digits(s);
        let raw = match d.len() {
            10 => vec![weighted_mod(&d[..9], &INN10_WEIGHTS, 11)],
            12 => vec![
                weighted_mod(&d[..10], &INN12_WEIGHTS_1, 11),
                weighted_mod(&d[..11], &INN12_WEIGHTS_2, 11),
            ],
            _ => Vec::new(),
        };
        raw.contains(&10)
    }

    #[test]
    fn test_inn_single_digit_mutations() {
        for inn in ["7707083893", "7830002293", "500100732259"] {
            assert_digit_mutations_fail_except(inn, |s| inn_checksum(&digits(s)), inn_collapses);
        }
    }

    /// OGRN remainders of 10 and above share a check digit with a smaller one.
    fn ogrn_collapses(s: &str) -> bool {
        let d = digits(s);
        let raw = match d.len() {
            13 => number_mod(&d[..12], 11),
            15 => number_mod(&d[..14], 13),
            _ => 0,
        };
        raw >= 10
    }

    #[test]
    fn test_ogrn_single_digit_mutations() {
        for ogrn in ["1027700132195", "304500116000157"] {
            assert_digit_mutations_fail_except(
                ogrn,
                |s| ogrn_checksum(&digits(s)),
                ogrn_collapses,
            );
        }
    }

    #[test]
    fn test_ogrn() {
        assert!(ogrn_checksum(&digits("1027700132195")));
        assert!(ogrn_checksum(&digits("304500116000157")));
        assert!(!ogrn_checksum(&digits("1027700132196")));
        assert!(!ogrn_checksum(&digits("304500116000158")));
        assert!(!ogrn_checksum(&digits("10277001321")));
    }

    #[test]
    fn test_snils() {
        assert!(snils_checksum(&digits("112-233-445 95")));
        assert!(snils_checksum(&digits("087-654-303 00")));
        assert!(!snils_checksum(&digits("112-233-445 96")));
        assert_digit_mutations_fail("11223344595", |s| snils_checksum(&digits(s)));
    }

    #[test]
    fn test_vin() {
        assert!(vin_checksum("1M8GDM9AXKP042788"));
        assert!(vin_checksum("1HGCM82633A004352"));
        assert!(vin_checksum("JH4KA7561PC008269"));
        assert!(!vin_checksum("1M8GDM9AXKP042789"));
        assert!(!vin_checksum("1M8GDM9AXKP04278"));
        assert!(!vin_checksum("1M8GDM9AXKP0427O8"));
    }

    #[test]
    fn test_vin_single_digit_mutations() {
        for vin in ["1M8GDM9AXKP042788", "1HGCM82633A004352", "JH4KA7561PC008269"] {
            assert_digit_mutations_fail(vin, vin_checksum);
        }
    }
}
