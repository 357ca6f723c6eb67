//! Structural validity: calendar dates, dictionaries and fixed field layouts.

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Earliest year accepted for dates of birth and document issue dates.
pub const MIN_PLAUSIBLE_YEAR: i32 = 1900;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(\d{4})-(\d{1,2})-(\d{1,2})\b)|(?:\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b)")
        .expect("Date regex is hardcoded and valid")
});

/// A real calendar date (leap-year aware).
#[must_use]
pub fn is_valid_date(year: i32, month: u32, day: u32) -> bool {
    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

/// Gregorian leap year rule.
#[must_use]
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Year between [`MIN_PLAUSIBLE_YEAR`] and the current year inclusive.
#[must_use]
pub fn is_plausible_year(year: i32) -> bool {
    (MIN_PLAUSIBLE_YEAR..=Utc::now().year()).contains(&year)
}

/// Extract the first date in `s`.
///
/// Accepts ISO `YYYY-MM-DD` and day-first `DD.MM.YYYY` / `DD/MM/YYYY`. When
/// the day-first reading is not a real date, the month-first reading is tried.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE_PATTERN.captures(s)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    if let (Some(year), Some(month), Some(day)) = (num(1), num(2), num(3)) {
        return NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day);
    }

    let (first, second, year) = (num(4)?, num(5)?, num(6)?);
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, second, first)
        .or_else(|| NaiveDate::from_ymd_opt(year, first, second))
}

/// A date of birth: a real date in a plausible year, not in the future.
#[must_use]
pub fn is_plausible_birth_date(date: NaiveDate) -> bool {
    is_plausible_year(date.year()) && date <= Utc::now().date_naive()
}

/// Two-digit region codes (OKATO) used in Russian passport series.
const RU_REGION_CODES: &[u8] = &[
    1, 3, 4, 5, 7, 8, 10, 11, 12, 14, 15, 17, 18, 19, 20, 22, 24, 25, 26, 27, 28, 29, 30, 32, 33,
    34, 35, 36, 37, 38, 40, 41, 42, 44, 45, 46, 47, 49, 50, 52, 53, 54, 56, 57, 58, 60, 61, 63,
    64, 65, 66, 67, 68, 69, 70, 71, 73, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89,
    90, 91, 92, 93, 94, 95, 96, 97, 98, 99,
];

/// Whether `code` is a known Russian region code.
#[must_use]
pub fn is_ru_region(code: u8) -> bool {
    RU_REGION_CODES.binary_search(&code).is_ok()
}

/// Passport series issue year (`97`..`99` or `00`..current) is plausible.
#[must_use]
pub fn is_plausible_issue_year(yy: u8) -> bool {
    let current = u8::try_from(Utc::now().year() % 100).unwrap_or(99);
    (97..=99).contains(&yy) || yy <= current.saturating_add(1)
}

/// IBAN lengths per country code.
#[rustfmt::skip]
const IBAN_LENGTHS: &[(&str, usize)] = &[
    ("AD", 24), ("AE", 23), ("AL", 28), ("AT", 20), ("AZ", 28), ("BA", 20), ("BE", 16),
    ("BG", 22), ("BH", 22), ("BR", 29), ("BY", 28), ("CH", 21), ("CR", 22), ("CY", 28),
    ("CZ", 24), ("DE", 22), ("DK", 18), ("DO", 28), ("EE", 20), ("EG", 29), ("ES", 24),
    ("FI", 18), ("FO", 18), ("FR", 27), ("GB", 22), ("GE", 22), ("GI", 23), ("GL", 18),
    ("GR", 27), ("GT", 28), ("HR", 21), ("HU", 28), ("IE", 22), ("IL", 23), ("IQ", 23),
    ("IS", 26), ("IT", 27), ("JO", 30), ("KW", 30), ("KZ", 20), ("LB", 28), ("LC", 32),
    ("LI", 21), ("LT", 20), ("LU", 20), ("LV", 21), ("MC", 27), ("MD", 24), ("ME", 22),
    ("MK", 19), ("MR", 27), ("MT", 31), ("MU", 30), ("NL", 18), ("NO", 15), ("PK", 24),
    ("PL", 28), ("PS", 29), ("PT", 25), ("QA", 29), ("RO", 24), ("RS", 22), ("RU", 33),
    ("SA", 24), ("SC", 31), ("SE", 24), ("SI", 19), ("SK", 24), ("SM", 27), ("TN", 24),
    ("TR", 26), ("UA", 29), ("VA", 22), ("VG", 24), ("XK", 20),
];

/// Expected IBAN length for a two-letter country code.
#[must_use]
pub fn iban_length(country: &str) -> Option<usize> {
    IBAN_LENGTHS
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, len)| *len)
}

/// US Social Security Number field rules.
///
/// Area `000`, `666` and `900-999` were never issued; group `00` and serial
/// `0000` are invalid.
#[must_use]
pub fn is_valid_ssn(area: u16, group: u8, serial: u16) -> bool {
    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

/// Dotted-quad IPv4 with octets in range and no leading zeros.
#[must_use]
pub fn is_valid_ipv4(s: &str) -> bool {
    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    let mut values = [0u8; 4];
    for (slot, octet) in values.iter_mut().zip(&octets) {
        if octet.is_empty() || octet.len() > 3 || (octet.len() > 1 && octet.starts_with('0')) {
            return false;
        }
        match octet.parse::<u8>() {
            Ok(v) => *slot = v,
            Err(_) => return false,
        }
    }
    values[0] != 0
}

/// Latitude/longitude in range and not the null island `0,0`.
#[must_use]
pub fn is_valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
        && !(lat == 0.0 && lon == 0.0)
}

/// Payment card networks recognized by their issuer identification number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardScheme {
    /// Visa
    Visa,
    /// Mastercard
    Mastercard,
    /// American Express
    Amex,
    /// Discover
    Discover,
    /// Mir
    Mir,
    /// JCB
    Jcb,
    /// `UnionPay`
    UnionPay,
    /// Diners Club
    Diners,
    /// Maestro
    Maestro,
}

fn prefix(digits: &[u8], len: usize) -> u32 {
    digits
        .iter()
        .take(len)
        .fold(0, |acc, &d| acc * 10 + u32::from(d))
}

/// Identify the card scheme from the leading digits and total length.
///
/// Returns `None` when no scheme issues numbers with this prefix and length.
#[must_use]
pub fn card_scheme(digits: &[u8]) -> Option<CardScheme> {
    let len = digits.len();
    if !(12..=19).contains(&len) {
        return None;
    }
    let p1 = prefix(digits, 1);
    let p2 = prefix(digits, 2);
    let p3 = prefix(digits, 3);
    let p4 = prefix(digits, 4);

    if (2200..=2204).contains(&p4) && len >= 16 {
        Some(CardScheme::Mir)
    } else if p1 == 4 && matches!(len, 13 | 16 | 19) {
        Some(CardScheme::Visa)
    } else if ((51..=55).contains(&p2) || (2221..=2720).contains(&p4)) && len == 16 {
        Some(CardScheme::Mastercard)
    } else if matches!(p2, 34 | 37) && len == 15 {
        Some(CardScheme::Amex)
    } else if (p4 == 6011 || p2 == 65 || (644..=649).contains(&p3)) && matches!(len, 16 | 19) {
        Some(CardScheme::Discover)
    } else if (3528..=3589).contains(&p4) && len >= 16 {
        Some(CardScheme::Jcb)
    } else if p2 == 62 && len >= 16 {
        Some(CardScheme::UnionPay)
    } else if (matches!(p2, 36 | 38 | 39) || (300..=305).contains(&p3))
        && (14..=16).contains(&len)
    {
        Some(CardScheme::Diners)
    } else if matches!(p2, 50 | 56..=58 | 63 | 67) {
        Some(CardScheme::Maestro)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::digits;

    #[test]
    fn test_calendar_dates() {
        assert!(is_valid_date(2024, 2, 29));
        assert!(!is_valid_date(2023, 2, 29));
        assert!(!is_valid_date(1900, 2, 29));
        assert!(is_valid_date(2000, 2, 29));
        assert!(!is_valid_date(2024, 4, 31));
        assert!(!is_valid_date(2024, 13, 1));
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("1985-03-14"), NaiveDate::from_ymd_opt(1985, 3, 14));
        assert_eq!(parse_date("born 14.03.1985"), NaiveDate::from_ymd_opt(1985, 3, 14));
        // Day-first is impossible, month-first is used
        assert_eq!(parse_date("03/14/1985"), NaiveDate::from_ymd_opt(1985, 3, 14));
        assert_eq!(parse_date("31.02.1985"), None);
        assert_eq!(parse_date("no date"), None);
    }

    #[test]
    fn test_birth_date_plausibility() {
        let date = NaiveDate::from_ymd_opt(1985, 3, 14).expect("valid date");
        assert!(is_plausible_birth_date(date));
        let ancient = NaiveDate::from_ymd_opt(1850, 1, 1).expect("valid date");
        assert!(!is_plausible_birth_date(ancient));
        let future = NaiveDate::from_ymd_opt(Utc::now().year() + 1, 1, 1).expect("valid date");
        assert!(!is_plausible_birth_date(future));
    }

    #[test]
    fn test_region_codes() {
        assert!(is_ru_region(45));
        assert!(is_ru_region(1));
        assert!(!is_ru_region(0));
        assert!(!is_ru_region(2));
        assert!(!is_ru_region(100));
    }

    #[test]
    fn test_issue_year() {
        assert!(is_plausible_issue_year(98));
        assert!(is_plausible_issue_year(8));
        assert!(!is_plausible_issue_year(60));
    }

    #[test]
    fn test_iban_lengths() {
        assert_eq!(iban_length("GB"), Some(22));
        assert_eq!(iban_length("RU"), Some(33));
        assert_eq!(iban_length("US"), None);
    }

    #[test]
    fn test_ssn_rules() {
        assert!(is_valid_ssn(536, 22, 1479));
        assert!(!is_valid_ssn(0, 22, 1479));
        assert!(!is_valid_ssn(666, 22, 1479));
        assert!(!is_valid_ssn(901, 22, 1479));
        assert!(!is_valid_ssn(536, 0, 1479));
        assert!(!is_valid_ssn(536, 22, 0));
    }

    #[test]
    fn test_ipv4() {
        assert!(is_valid_ipv4("192.168.1.10"));
        assert!(is_valid_ipv4("8.8.8.8"));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("192.168.01.1"));
        assert!(!is_valid_ipv4("0.1.2.3"));
        assert!(!is_valid_ipv4("1.2.3"));
    }

    #[test]
    fn test_coordinates() {
        assert!(is_valid_coordinates(55.7558, 37.6173));
        assert!(is_valid_coordinates(-33.8688, 151.2093));
        assert!(!is_valid_coordinates(91.0, 10.0));
        assert!(!is_valid_coordinates(10.0, -180.5));
        assert!(!is_valid_coordinates(0.0, 0.0));
    }

    #[test]
    fn test_card_schemes() {
        assert_eq!(card_scheme(&digits("4111111111111111")), Some(CardScheme::Visa));
        assert_eq!(card_scheme(&digits("5500000000000004")), Some(CardScheme::Mastercard));
        assert_eq!(card_scheme(&digits("378282246310005")), Some(CardScheme::Amex));
        assert_eq!(card_scheme(&digits("2200000000000004")), Some(CardScheme::Mir));
        assert_eq!(card_scheme(&digits("6011111111111117")), Some(CardScheme::Discover));
        assert_eq!(card_scheme(&digits("9111111111111111")), None);
        assert_eq!(card_scheme(&digits("41111111111111")), None);
    }
}
