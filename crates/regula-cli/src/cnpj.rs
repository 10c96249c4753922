//! # CNPJ Subcommand
//!
//! `regula cnpj validate <CNPJ>...` and `regula cnpj format <CNPJ>`.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use regula_core::cnpj;

use crate::{EXIT_CHECK_FAILED, EXIT_OK};

/// Arguments for the `regula cnpj` subcommand.
#[derive(Args, Debug)]
pub struct CnpjArgs {
    #[command(subcommand)]
    pub command: CnpjCommand,
}

#[derive(Subcommand, Debug)]
pub enum CnpjCommand {
    /// Check one or more CNPJ numbers. Fails if any is invalid.
    Validate {
        /// CNPJ numbers, formatted or bare.
        #[arg(value_name = "CNPJ", required = true)]
        values: Vec<String>,

        /// Print one JSON object per line instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the `XX.XXX.XXX/XXXX-XX` form of a CNPJ.
    Format {
        #[arg(value_name = "CNPJ")]
        value: String,
    },
}

/// Outcome of checking one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnpjReport {
    pub input: String,
    pub valid: bool,
    pub formatted: String,
}

impl CnpjReport {
    pub fn check(input: &str) -> Self {
        Self {
            input: input.to_string(),
            valid: cnpj::validate(input),
            formatted: cnpj::format(input),
        }
    }
}

/// Execute the cnpj subcommand.
pub fn run_cnpj(args: &CnpjArgs) -> Result<u8> {
    match &args.command {
        CnpjCommand::Validate { values, json } => {
            let reports: Vec<CnpjReport> = values.iter().map(|v| CnpjReport::check(v)).collect();
            for report in &reports {
                if *json {
                    println!("{}", serde_json::to_string(report)?);
                } else {
                    let verdict = if report.valid { "valid" } else { "INVALID" };
                    println!("{:<7}  {}", verdict, report.formatted);
                }
            }
            let invalid = reports.iter().filter(|r| !r.valid).count();
            tracing::info!(checked = reports.len(), invalid, "cnpj validation finished");
            Ok(if invalid > 0 { EXIT_CHECK_FAILED } else { EXIT_OK })
        }
        CnpjCommand::Format { value } => {
            if cnpj::strip_non_digits(value).len() != 14 {
                eprintln!("{value:?} does not contain 14 digits");
                return Ok(EXIT_CHECK_FAILED);
            }
            if !cnpj::validate(value) {
                tracing::warn!(input = %value, "check digits do not match");
            }
            println!("{}", cnpj::format(value));
            Ok(EXIT_OK)
        }
    }
}
