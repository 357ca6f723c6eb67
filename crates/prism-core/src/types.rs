//! Identifier newtypes and timestamps shared by every Prism crate.

use crate::error::PrismError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn is_uuid_v4(id: &str) -> bool {
    static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
    UUID_REGEX
        .get_or_init(|| {
            Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
                .expect("UUID regex is hardcoded and valid")
        })
        .is_match(id)
}

/// Declares a UUID-v4 backed identifier newtype.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $what:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Parse a ", $what, " ID, which must be a lowercase UUID v4.")]
            pub fn new(id: impl Into<String>) -> Result<Self, PrismError> {
                let id = id.into();
                if is_uuid_v4(&id) {
                    Ok(Self(id))
                } else {
                    Err(PrismError::Validation(format!(
                        concat!("invalid ", $what, " ID '{}': expected a UUID v4"),
                        id
                    )))
                }
            }

            #[doc = concat!("A fresh random ", $what, " ID.")]
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// The ID as stored.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = PrismError;

            fn try_from(id: String) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a scan task.
    TaskId,
    "task"
);

uuid_id!(
    /// Identifier of one file work item within a task.
    FileId,
    "file"
);

/// Stable identifier of a detector.
///
/// Detector IDs are `UpperCamelCase` ASCII, 2-48 characters (`CardNumber`, `Iban`).
/// They are persisted with scan results, so renaming one orphans old results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectorId(String);

impl DetectorId {
    /// Create a new `DetectorId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, PrismError> {
        static DETECTOR_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = DETECTOR_REGEX
            .get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]{1,47}$").expect("valid regex"));

        let id = id.into();
        if regex.is_match(&id) {
            Ok(Self(id))
        } else {
            Err(PrismError::Validation(format!(
                "invalid detector ID: must be UpperCamelCase alphanumeric, got '{id}'"
            )))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, PrismError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| PrismError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}
