//! Compliance-engine error types.
//!
//! Loading errors carry the file path so a bad override file is easy to
//! find; matching errors distinguish a missing company from a storage
//! failure so the API can map them to 404 and 500.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors loading or validating risk tables and requirement catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required file was not found.
    #[error("required file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Reading the file failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing failed.
    #[error("failed to parse YAML at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Two catalog entries share a code.
    #[error("duplicate requirement code {code:?}")]
    DuplicateCode { code: String },

    /// A requirement entry is malformed.
    #[error("invalid requirement {code:?}: {reason}")]
    InvalidRequirement { code: String, reason: String },

    /// A risk-table entry is malformed.
    #[error("invalid risk table: {0}")]
    InvalidTable(String),
}

/// Failure reported by a [`crate::ComplianceRepository`] implementation.
#[derive(Debug, Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);

/// Errors from obligation generation.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The company does not exist.
    #[error("company {0} not found")]
    CompanyNotFound(Uuid),

    /// The repository failed to read or write.
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
