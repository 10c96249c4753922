//! # regula-cli: Offline Operator Tooling
//!
//! Provides the `regula` command-line interface. Every subcommand runs
//! against the same rule crates the API uses, without a server or database.
//!
//! ## Subcommands
//!
//! - `regula cnpj validate|format`: CNPJ checksum and display form.
//! - `regula classify`: risk tier for an activity code in a state.
//! - `regula match`: which catalog requirements apply to a company profile.
//! - `regula catalog check`: validate a catalog or risk-table file.
//!
//! ## Exit Codes
//!
//! `0` success, `1` a check failed, `2` operational error (unreadable file,
//! malformed argument).
//!
//! ```bash
//! regula cnpj validate 11.222.333/0001-81
//! regula classify --activity 0510-0/00 --state AM
//! regula match --activity 4711-3/02 --state SP --catalog catalog.yaml
//! regula catalog check catalog.yaml
//! ```

pub mod catalog;
pub mod classify;
pub mod cnpj;
pub mod matching;

use std::path::Path;

use anyhow::{Context, Result};
use regula_compliance::{RequirementCatalog, RiskTables};

/// Exit code for a successful run.
pub const EXIT_OK: u8 = 0;
/// Exit code when a check ran and failed.
pub const EXIT_CHECK_FAILED: u8 = 1;
/// Exit code for an operational error.
pub const EXIT_ERROR: u8 = 2;

/// Load risk tables from `path`, or the built-in defaults.
pub fn load_tables(path: Option<&Path>) -> Result<RiskTables> {
    match path {
        Some(path) => RiskTables::from_yaml_file(path)
            .with_context(|| format!("failed to load risk tables from {}", path.display())),
        None => Ok(RiskTables::default()),
    }
}

/// Load a requirement catalog from `path`, or the built-in catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<RequirementCatalog> {
    match path {
        Some(path) => RequirementCatalog::from_yaml_file(path)
            .with_context(|| format!("failed to load catalog from {}", path.display())),
        None => RequirementCatalog::builtin().context("built-in catalog is invalid"),
    }
}
