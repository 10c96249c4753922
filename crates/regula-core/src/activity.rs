//! # Economic Activity Codes (CNAE)
//!
//! A CNAE subclass code is seven digits, conventionally written
//! `NNNN-N/NN` (e.g. `0510-0/00`, coal mining). Risk tables and the
//! requirement catalog key on the four-digit *class prefix*, so this type
//! also accepts shorter codes down to the bare prefix.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Length of the class prefix used for risk and applicability lookups.
pub const PREFIX_LEN: usize = 4;

/// Maximum digits in a CNAE subclass.
const MAX_DIGITS: usize = 7;

/// A validated CNAE activity code.
///
/// Stored in canonical `NNNN-N/NN` form when seven digits are given, or as
/// bare digits otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityCode(String);

impl ActivityCode {
    /// Parse an activity code.
    ///
    /// Accepts digits separated by `-`, `/`, `.` or spaces. Needs between
    /// four and seven digits.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidActivityCode`] on any other
    /// character or an out-of-range digit count.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();

        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_digit() || matches!(c, '-' | '/' | '.' | ' ')))
        {
            return Err(ValidationError::InvalidActivityCode {
                value: raw.clone(),
                reason: format!("unexpected character {c:?}"),
            });
        }

        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < PREFIX_LEN || digits.len() > MAX_DIGITS {
            return Err(ValidationError::InvalidActivityCode {
                value: raw,
                reason: format!(
                    "expected {PREFIX_LEN} to {MAX_DIGITS} digits, found {}",
                    digits.len()
                ),
            });
        }

        let canonical = if digits.len() == MAX_DIGITS {
            format!("{}-{}/{}", &digits[..4], &digits[4..5], &digits[5..])
        } else {
            digits
        };
        Ok(Self(canonical))
    }

    /// The canonical code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four-digit class prefix, e.g. `"0510"` for `0510-0/00`.
    pub fn prefix(&self) -> &str {
        // Canonical form always starts with the four prefix digits.
        &self.0[..PREFIX_LEN]
    }

    /// Whether this code's class prefix matches `prefix`.
    ///
    /// `prefix` may itself be a full code; only its first four digits count.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let other: String = prefix
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(PREFIX_LEN)
            .collect();
        other.len() == PREFIX_LEN && other == self.prefix()
    }
}

impl std::fmt::Display for ActivityCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActivityCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActivityCode> for String {
    fn from(code: ActivityCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for ActivityCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
