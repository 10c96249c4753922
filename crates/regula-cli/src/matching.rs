//! # Match Subcommand
//!
//! Dry run of the applicability filter: which active catalog requirements
//! would become obligations for a company with the given activities and
//! state. Nothing is stored.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use regula_compliance::{applicable_requirements, CompanyProfile, RiskClassifier};
use regula_core::{ActivityCode, RiskTier, StateCode};

use crate::EXIT_OK;

/// Arguments for the `regula match` subcommand.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Primary CNAE activity code.
    #[arg(long)]
    pub activity: String,

    /// Secondary activity code. Repeatable.
    #[arg(long = "secondary", value_name = "CODE")]
    pub secondary: Vec<String>,

    /// Two-letter state (UF) code.
    #[arg(long)]
    pub state: String,

    /// Requirement catalog YAML overriding the built-in catalog.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Risk-table YAML overriding the built-in tables.
    #[arg(long, value_name = "FILE")]
    pub tables: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// A requirement that would be generated.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedRequirement {
    pub code: String,
    pub title: String,
    pub agency: String,
    pub risk_level: RiskTier,
    pub deadline_days: Option<u32>,
}

/// Result of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub company_risk: RiskTier,
    pub requirements: Vec<MatchedRequirement>,
}

/// Run the matcher without printing.
pub fn dry_run(args: &MatchArgs) -> Result<MatchReport> {
    let primary_activity =
        ActivityCode::new(args.activity.as_str()).context("invalid --activity")?;
    let secondary_activities = args
        .secondary
        .iter()
        .map(|code| {
            ActivityCode::new(code.as_str()).with_context(|| format!("invalid --secondary {code:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let state = StateCode::new(args.state.as_str()).context("invalid --state")?;

    let classifier = RiskClassifier::new(crate::load_tables(args.tables.as_deref())?);
    let company_risk = classifier.classify(&primary_activity, &state);

    let requirements = crate::load_catalog(args.catalog.as_deref())?.into_requirements();
    let profile = CompanyProfile {
        id: uuid::Uuid::nil(),
        state,
        primary_activity,
        secondary_activities,
    };
    tracing::debug!(catalog_size = requirements.len(), "matching against catalog");

    let mut matched: Vec<MatchedRequirement> = applicable_requirements(&requirements, &profile)
        .into_iter()
        .map(|r| MatchedRequirement {
            code: r.code.clone(),
            title: r.title.clone(),
            agency: r.agency.clone(),
            risk_level: r.risk_level,
            deadline_days: r.deadline_days,
        })
        .collect();
    matched.sort_by(|a, b| a.code.cmp(&b.code));

    Ok(MatchReport {
        company_risk,
        requirements: matched,
    })
}

/// Execute the match subcommand.
pub fn run_match(args: &MatchArgs) -> Result<u8> {
    let report = dry_run(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(EXIT_OK);
    }

    println!("Company risk: {}", report.company_risk.as_str());
    println!("Applicable requirements: {}", report.requirements.len());
    for r in &report.requirements {
        let deadline = r
            .deadline_days
            .map(|d| format!("{d}d"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<32} {:<8} {:>5}  {}",
            r.code,
            r.risk_level.as_str(),
            deadline,
            r.agency
        );
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = "\
requirements:
  - code: EVERYONE
    title: Everyone
    category: general
    agency: Agency
    risk_level: low
  - code: MINING-PA
    title: Mining in Pará
    category: environmental
    agency: SEMAS
    activity_prefixes: ['0710']
    states: [PA]
    risk_level: critical
    deadline_days: 60
  - code: RETIRED
    title: Retired
    category: general
    agency: Agency
    risk_level: low
    active: false
";

    fn args(catalog: &tempfile::NamedTempFile, state: &str, secondary: &[&str]) -> MatchArgs {
        MatchArgs {
            activity: "4711-3/02".into(),
            secondary: secondary.iter().map(|s| s.to_string()).collect(),
            state: state.into(),
            catalog: Some(catalog.path().to_path_buf()),
            tables: None,
            json: false,
        }
    }

    fn catalog_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        file
    }

    fn codes(report: &MatchReport) -> Vec<&str> {
        report.requirements.iter().map(|r| r.code.as_str()).collect()
    }

    #[test]
    fn secondary_activity_widens_match() {
        let file = catalog_file();
        let plain = dry_run(&args(&file, "PA", &[])).unwrap();
        assert_eq!(codes(&plain), ["EVERYONE"]);

        let mining = dry_run(&args(&file, "PA", &["0710-3/01"])).unwrap();
        assert_eq!(codes(&mining), ["EVERYONE", "MINING-PA"]);
    }

    #[test]
    fn state_filter_applies() {
        let file = catalog_file();
        let report = dry_run(&args(&file, "SP", &["0710-3/01"])).unwrap();
        assert_eq!(codes(&report), ["EVERYONE"]);
    }

    #[test]
    fn builtin_catalog_matches_something() {
        let report = dry_run(&MatchArgs {
            activity: "0510-0/00".into(),
            secondary: vec![],
            state: "AM".into(),
            catalog: None,
            tables: None,
            json: false,
        })
        .unwrap();
        assert_eq!(report.company_risk, RiskTier::Critical);
        assert!(!report.requirements.is_empty());
    }

    #[test]
    fn bad_secondary_is_an_error() {
        let file = catalog_file();
        assert!(dry_run(&args(&file, "SP", &["x"])).is_err());
    }
}
