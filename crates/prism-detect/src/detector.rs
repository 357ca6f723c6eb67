//! Detectors: coarse patterns paired with a precise validator.

use crate::error::{DetectError, Result};
use crate::pattern::Pattern;
use prism_core::DetectorId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation predicate applied to every candidate a detector's patterns produce.
///
/// Validators are total: a malformed candidate is rejected, never an error.
pub type ValidateFn = fn(&str) -> bool;

/// Category of sensitive data a detector reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Payment card numbers
    PaymentCard,
    /// Bank account identifiers
    BankAccount,
    /// Personal identity documents and insurance numbers
    NationalId,
    /// Taxpayer identifiers
    TaxNumber,
    /// Company registry identifiers
    CompanyId,
    /// Phone numbers and email addresses
    Contact,
    /// Secrets, keys and passwords
    Credential,
    /// Geographic coordinates
    Geolocation,
    /// Cryptocurrency wallet addresses
    CryptoWallet,
    /// Network addresses
    Network,
    /// Other personal attributes (dates of birth)
    Personal,
    /// Vehicle identifiers
    Vehicle,
}

impl Category {
    /// Stable name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PaymentCard => "PaymentCard",
            Self::BankAccount => "BankAccount",
            Self::NationalId => "NationalId",
            Self::TaxNumber => "TaxNumber",
            Self::CompanyId => "CompanyId",
            Self::Contact => "Contact",
            Self::Credential => "Credential",
            Self::Geolocation => "Geolocation",
            Self::CryptoWallet => "CryptoWallet",
            Self::Network => "Network",
            Self::Personal => "Personal",
            Self::Vehicle => "Vehicle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn accept_all(_candidate: &str) -> bool {
    true
}

/// A named unit of detection. Immutable once built.
#[derive(Clone)]
pub struct Detector {
    id: DetectorId,
    name: &'static str,
    category: Category,
    patterns: Vec<Pattern>,
    validate: ValidateFn,
}

impl Detector {
    /// Build a detector with a second-pass validator.
    pub fn new(
        id: &str,
        name: &'static str,
        category: Category,
        patterns: Vec<Pattern>,
        validate: ValidateFn,
    ) -> Result<Self> {
        let id = DetectorId::new(id)?;
        if patterns.is_empty() {
            return Err(DetectError::NoPatterns(id.to_string()));
        }
        Ok(Self {
            id,
            name,
            category,
            patterns,
            validate,
        })
    }

    /// Build a detector whose pattern matches are accepted as-is.
    pub fn regex_only(
        id: &str,
        name: &'static str,
        category: Category,
        patterns: Vec<Pattern>,
    ) -> Result<Self> {
        Self::new(id, name, category, patterns, accept_all)
    }

    /// Stable identifier.
    #[must_use]
    pub fn id(&self) -> &DetectorId {
        &self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reported category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Coarse patterns.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Run the validator on one candidate.
    #[must_use]
    pub fn validate(&self, candidate: &str) -> bool {
        (self.validate)(candidate)
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("patterns", &self.patterns.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even_length(s: &str) -> bool {
        s.len() % 2 == 0
    }

    #[test]
    fn test_detector_validates() {
        let detector = Detector::new(
            "EvenDigits",
            "Even digits",
            Category::Personal,
            vec![Pattern::new(r"\d+").expect("valid pattern")],
            even_length,
        )
        .expect("valid detector");
        assert!(detector.validate("12"));
        assert!(!detector.validate("123"));
        assert_eq!(detector.id().as_str(), "EvenDigits");
        assert_eq!(detector.category(), Category::Personal);
    }

    #[test]
    fn test_regex_only_accepts_everything() {
        let detector = Detector::regex_only(
            "Anything",
            "Anything",
            Category::Credential,
            vec![Pattern::new(r"x").expect("valid pattern")],
        )
        .expect("valid detector");
        assert!(detector.validate(""));
        assert!(detector.validate("whatever"));
    }

    #[test]
    fn test_detector_requires_patterns() {
        let err = Detector::regex_only("Empty", "Empty", Category::Network, Vec::new())
            .expect_err("no patterns");
        assert!(matches!(err, DetectError::NoPatterns(_)));
    }

    #[test]
    fn test_detector_rejects_bad_id() {
        let err = Detector::regex_only(
            "not-an-id",
            "Bad",
            Category::Network,
            vec![Pattern::new(r"x").expect("valid pattern")],
        )
        .expect_err("bad id");
        assert!(matches!(err, DetectError::Core(_)));
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::CryptoWallet).expect("serialize category");
        assert_eq!(json, "\"CryptoWallet\"");
    }
}
