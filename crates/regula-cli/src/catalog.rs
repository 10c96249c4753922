//! # Catalog Subcommand
//!
//! `regula catalog check <FILE>` parses and validates a requirement catalog
//! or risk-table file with the same rules the API applies at startup, so a
//! bad override is caught before deployment.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use regula_compliance::{CatalogError, RequirementCatalog, RiskTables};

use crate::{EXIT_CHECK_FAILED, EXIT_OK};

/// Arguments for the `regula catalog` subcommand.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Validate a catalog or risk-table file.
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// File kind. `auto` looks at the top-level keys.
        #[arg(long, value_enum, default_value_t = FileKind::Auto)]
        kind: FileKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileKind {
    Auto,
    Requirements,
    Tables,
}

/// Summary of a file that passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSummary {
    Requirements { total: usize, active: usize },
    Tables { high: usize, medium: usize, heightened_states: usize },
}

/// Execute the catalog subcommand.
pub fn run_catalog(args: &CatalogArgs) -> Result<u8> {
    match &args.command {
        CatalogCommand::Check { path, kind } => match check_file(path, *kind)? {
            Ok(CheckSummary::Requirements { total, active }) => {
                println!("OK: {} requirement(s), {} active", total, active);
                Ok(EXIT_OK)
            }
            Ok(CheckSummary::Tables {
                high,
                medium,
                heightened_states,
            }) => {
                println!(
                    "OK: risk tables ({} high, {} medium prefixes; {} heightened states)",
                    high, medium, heightened_states
                );
                Ok(EXIT_OK)
            }
            Err(reason) => {
                println!("FAIL: {}: {}", path.display(), reason);
                Ok(EXIT_CHECK_FAILED)
            }
        },
    }
}

/// Check a file.
///
/// The outer error is operational (missing or unreadable file); the inner
/// one is a content problem reported to the operator.
pub fn check_file(path: &Path, kind: FileKind) -> Result<Result<CheckSummary, String>> {
    let kind = match kind {
        FileKind::Auto => detect_kind(path)?,
        other => other,
    };
    tracing::info!(path = %path.display(), ?kind, "checking file");

    let outcome = match kind {
        FileKind::Requirements => RequirementCatalog::from_yaml_file(path).map(|catalog| {
            CheckSummary::Requirements {
                total: catalog.len(),
                active: catalog.requirements.iter().filter(|r| r.active).count(),
            }
        }),
        FileKind::Tables => RiskTables::from_yaml_file(path).map(|tables| CheckSummary::Tables {
            high: tables.high_risk_prefixes.len(),
            medium: tables.medium_risk_prefixes.len(),
            heightened_states: tables.heightened_states.len(),
        }),
        FileKind::Auto => bail!("could not determine file kind for {}", path.display()),
    };

    match outcome {
        Ok(summary) => Ok(Ok(summary)),
        Err(e @ (CatalogError::FileNotFound { .. } | CatalogError::Io { .. })) => Err(e.into()),
        Err(e) => Ok(Err(e.to_string())),
    }
}

/// Guess the file kind from its top-level keys.
fn detect_kind(path: &Path) -> Result<FileKind> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(value) => value,
        // Let the typed loader report the parse error with its location.
        Err(_) => return Ok(FileKind::Requirements),
    };

    let has = |key: &str| value.get(key).is_some();
    if has("requirements") {
        Ok(FileKind::Requirements)
    } else if has("high_risk_prefixes") || has("medium_risk_prefixes") || has("heightened_states")
    {
        Ok(FileKind::Tables)
    } else {
        bail!(
            "{} is neither a requirement catalog nor a risk-table file; pass --kind",
            path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_catalog_passes() {
        let f = file(
            "requirements:\n  - code: A\n    title: A\n    category: c\n    agency: x\n    risk_level: low\n  - code: B\n    title: B\n    category: c\n    agency: x\n    risk_level: high\n    active: false\n",
        );
        let summary = check_file(f.path(), FileKind::Auto).unwrap().unwrap();
        assert_eq!(summary, CheckSummary::Requirements { total: 2, active: 1 });
    }

    #[test]
    fn duplicate_codes_fail() {
        let f = file(
            "requirements:\n  - code: A\n    title: A\n    category: c\n    agency: x\n    risk_level: low\n  - code: A\n    title: Again\n    category: c\n    agency: x\n    risk_level: low\n",
        );
        let reason = check_file(f.path(), FileKind::Auto).unwrap().unwrap_err();
        assert!(reason.contains("duplicate"), "{reason}");
    }

    #[test]
    fn unknown_state_fails() {
        let f = file(
            "requirements:\n  - code: A\n    title: A\n    category: c\n    agency: x\n    risk_level: low\n    states: [XX]\n",
        );
        assert!(check_file(f.path(), FileKind::Requirements).unwrap().is_err());
    }

    #[test]
    fn malformed_prefix_fails() {
        let f = file(
            "requirements:\n  - code: A\n    title: A\n    category: c\n    agency: x\n    risk_level: low\n    activity_prefixes: ['05']\n",
        );
        assert!(check_file(f.path(), FileKind::Auto).unwrap().is_err());
    }

    #[test]
    fn tables_are_detected() {
        let f = file("high_risk_prefixes: ['0510']\nmedium_risk_prefixes: ['4711']\nheightened_states: [AM, PA]\n");
        let summary = check_file(f.path(), FileKind::Auto).unwrap().unwrap();
        assert_eq!(
            summary,
            CheckSummary::Tables {
                high: 1,
                medium: 1,
                heightened_states: 2
            }
        );
    }

    #[test]
    fn overlapping_tables_fail() {
        let f = file("high_risk_prefixes: ['0510']\nmedium_risk_prefixes: ['0510']\nheightened_states: []\n");
        assert!(check_file(f.path(), FileKind::Tables).unwrap().is_err());
    }

    #[test]
    fn missing_file_is_operational_error() {
        assert!(check_file(Path::new("/nonexistent/catalog.yaml"), FileKind::Requirements).is_err());
        let args = CatalogArgs {
            command: CatalogCommand::Check {
                path: "/nonexistent/catalog.yaml".into(),
                kind: FileKind::Auto,
            },
        };
        assert!(run_catalog(&args).is_err());
    }

    #[test]
    fn unrecognized_file_needs_kind() {
        let f = file("something_else: 1\n");
        assert!(check_file(f.path(), FileKind::Auto).is_err());
    }
}
