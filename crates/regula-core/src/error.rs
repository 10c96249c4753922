//! # Error Hierarchy
//!
//! Validation errors raised when constructing domain primitives from
//! untrusted input. Each variant carries the rejected value so operators
//! can see exactly what was submitted.

use thiserror::Error;

/// Domain primitive validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// CNPJ failed the length, repetition, or check-digit rules.
    #[error("invalid CNPJ: {0:?}")]
    InvalidCnpj(String),

    /// Activity code is not a CNAE code (at least four leading digits).
    #[error("invalid activity code {value:?}: {reason}")]
    InvalidActivityCode {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Not one of the 27 Brazilian federative units.
    #[error("invalid state code: {0:?} (expected a two-letter UF such as \"SP\")")]
    InvalidStateCode(String),

    /// Unknown risk tier name.
    #[error("unknown risk tier: {0:?} (expected low, medium, high or critical)")]
    UnknownRiskTier(String),
}
