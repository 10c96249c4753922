//! # Jurisdictions
//!
//! Companies are registered in one of Brazil's 26 states or the Federal
//! District. The two-letter UF abbreviation is the jurisdiction key used by
//! the risk tables and by state-restricted legal requirements.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// All 27 federative units (26 states plus the Federal District).
pub const FEDERATIVE_UNITS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// A validated Brazilian state code (UF).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateCode(String);

impl StateCode {
    /// Parse a UF code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStateCode`] for anything outside
    /// [`FEDERATIVE_UNITS`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let upper = raw.trim().to_ascii_uppercase();
        if FEDERATIVE_UNITS.contains(&upper.as_str()) {
            Ok(Self(upper))
        } else {
            Err(ValidationError::InvalidStateCode(raw))
        }
    }

    /// The upper-case UF code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StateCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StateCode> for String {
    fn from(state: StateCode) -> Self {
        state.0
    }
}

impl std::str::FromStr for StateCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq<&str> for StateCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
