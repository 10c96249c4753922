//! # CNPJ: Cadastro Nacional da Pessoa Jurídica
//!
//! The Brazilian federal company registry number: 14 digits, the last two
//! of which are check digits computed with a weighted modulus-11 sum.
//!
//! ## Validation
//!
//! All non-digit characters are stripped first, so `"11.222.333/0001-81"`
//! and `"11222333000181"` are the same number. The stripped value must be
//! exactly 14 digits, must not be a single repeated digit (those pass the
//! checksum but are never issued), and both check digits must match.
//!
//! ## Formatting
//!
//! The canonical display form groups the digits 2-3-3-4-2:
//! `XX.XXX.XXX/XXXX-XX`. Input that does not strip to 14 digits is passed
//! through unchanged.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of digits in a CNPJ.
pub const CNPJ_LEN: usize = 14;

const FIRST_CHECK_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_CHECK_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Strip everything but ASCII digits.
pub fn strip_non_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Return `true` if `id` is a checksum-valid CNPJ.
///
/// Never fails: malformed input simply yields `false`.
pub fn validate(id: &str) -> bool {
    let digits: Vec<u32> = id.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != CNPJ_LEN {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_CHECK_WEIGHTS);
    if first != digits[12] {
        return false;
    }
    let second = check_digit(&digits[..13], &SECOND_CHECK_WEIGHTS);
    second == digits[13]
}

/// Format a CNPJ as `XX.XXX.XXX/XXXX-XX`.
///
/// Does not check the check digits. Input that does not strip to exactly
/// 14 digits is returned unchanged, which also makes the function
/// idempotent on already-formatted values.
pub fn format(id: &str) -> String {
    let digits = strip_non_digits(id);
    if digits.len() != CNPJ_LEN {
        return id.to_string();
    }
    group(&digits)
}

fn group(digits: &str) -> String {
    format!(
        "{}.{}.{}/{}-{}",
        &digits[..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..]
    )
}

/// A checksum-valid CNPJ stored in canonical 14-digit form.
///
/// Serializes as the bare digits; deserialization runs the same validation
/// as [`Cnpj::new`], so an invalid number can never be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Create a CNPJ from formatted or unformatted input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCnpj`] if [`validate`] rejects it.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        if !validate(&raw) {
            return Err(ValidationError::InvalidCnpj(raw));
        }
        Ok(Self(strip_non_digits(&raw)))
    }

    /// The 14 digits, no punctuation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `XX.XXX.XXX/XXXX-XX` display form.
    pub fn formatted(&self) -> String {
        group(&self.0)
    }

    /// The 8-digit root shared by every branch of the same company.
    pub fn root(&self) -> &str {
        &self.0[..8]
    }

    /// Whether this is the head office (branch `0001`).
    pub fn is_head_office(&self) -> bool {
        &self.0[8..12] == "0001"
    }
}

impl std::fmt::Display for Cnpj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for Cnpj {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cnpj> for String {
    fn from(cnpj: Cnpj) -> Self {
        cnpj.0
    }
}

impl std::str::FromStr for Cnpj {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
