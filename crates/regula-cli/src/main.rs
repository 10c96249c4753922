//! # regula CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use regula_cli::catalog::{run_catalog, CatalogArgs};
use regula_cli::classify::{run_classify, ClassifyArgs};
use regula_cli::cnpj::{run_cnpj, CnpjArgs};
use regula_cli::matching::{run_match, MatchArgs};

/// Regula operator CLI.
///
/// Validates CNPJ numbers, classifies activity risk, previews which
/// catalog requirements apply to a company, and checks catalog files
/// before they are deployed.
#[derive(Parser, Debug)]
#[command(name = "regula", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate or format CNPJ numbers.
    Cnpj(CnpjArgs),

    /// Classify an activity code in a state.
    Classify(ClassifyArgs),

    /// Dry-run the requirement matcher for a company profile.
    Match(MatchArgs),

    /// Check requirement catalog and risk-table files.
    Catalog(CatalogArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Cnpj(args) => run_cnpj(&args),
        Commands::Classify(args) => run_classify(&args),
        Commands::Match(args) => run_match(&args),
        Commands::Catalog(args) => run_catalog(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(regula_cli::EXIT_ERROR)
        }
    }
}
