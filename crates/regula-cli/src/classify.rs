//! # Classify Subcommand
//!
//! `regula classify --activity <code> --state <UF> [--tables file.yaml]`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use regula_compliance::{Classification, RiskClassifier};
use regula_core::{ActivityCode, StateCode};

use crate::EXIT_OK;

/// Arguments for the `regula classify` subcommand.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// CNAE activity code, e.g. `0510-0/00`.
    #[arg(long)]
    pub activity: String,

    /// Two-letter state (UF) code.
    #[arg(long)]
    pub state: String,

    /// Risk-table YAML overriding the built-in tables.
    #[arg(long, value_name = "FILE")]
    pub tables: Option<PathBuf>,

    /// Print the breakdown as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Classify the arguments without printing.
pub fn classify(args: &ClassifyArgs) -> Result<Classification> {
    let activity = ActivityCode::new(args.activity.as_str()).context("invalid --activity")?;
    let state = StateCode::new(args.state.as_str()).context("invalid --state")?;
    let classifier = RiskClassifier::new(crate::load_tables(args.tables.as_deref())?);
    Ok(classifier.explain(&activity, &state))
}

/// Execute the classify subcommand.
pub fn run_classify(args: &ClassifyArgs) -> Result<u8> {
    let result = classify(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("prefix:    {}", result.prefix);
        println!("base tier: {}", result.base_tier.as_str());
        println!(
            "state:     {}",
            if result.heightened_jurisdiction {
                "heightened jurisdiction"
            } else {
                "standard"
            }
        );
        println!("tier:      {}", result.tier.as_str());
    }
    Ok(EXIT_OK)
}
