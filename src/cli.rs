//! CLI glue for arg-report: argument parsing and command routing.
//!
//! All exploration logic lives in [`arg_report_core`]; this module loads
//! the type tables and parameters file named on the command line and hands
//! them to the pipeline.
//!
//! For programmatic and integration use, call [`run`] with a constructed
//! [`Cli`]; only `main` turns an error into a process exit.
use crate::load_config::{load_parameters, load_type_tables};
use anyhow::Result;
use arg_report_core::explore::explore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for arg-report: explore simulation artifacts and emit a report structure.
#[derive(Parser)]
#[clap(
    name = "arg-report",
    version,
    about = "Explore simulation artifacts and synthesise the structure of a technical report"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Maximum level of log events written to stderr
    #[clap(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explore the data directory named by the parameters file and write the structure file
    Explore {
        /// Path to the YAML parameters file
        #[clap(long, short)]
        parameters: PathBuf,
        /// YAML file overriding the built-in type tables
        #[clap(long)]
        types: Option<PathBuf>,
    },
    /// Parse and validate a parameters file without exploring
    Validate {
        /// Path to the YAML parameters file
        #[clap(long, short)]
        parameters: PathBuf,
        /// YAML file overriding the built-in type tables
        #[clap(long)]
        types: Option<PathBuf>,
    },
}

/// CLI entrypoint shared by `main` and the integration tests.
pub fn run(cli: Cli) -> Result<()> {
    tracing::info!("arg-report started");

    match cli.command {
        Commands::Explore { parameters, types } => {
            let tables = load_type_tables(types.as_deref())?;
            let mut parsed = load_parameters(&parameters, &tables)?;
            tracing::info!(command = "explore", "Starting exploration");
            match explore(&mut parsed.parameters, &tables) {
                Ok(report) => {
                    tracing::info!(command = "explore", chapters = report.chapters, "Exploration complete");
                    println!(
                        "Generated structure file {} including {} chapters",
                        report.structure_file.display(),
                        report.chapters
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "explore", error = %e, "Exploration failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Validate { parameters, types } => {
            let tables = load_type_tables(types.as_deref())?;
            let parsed = load_parameters(&parameters, &tables)?;
            println!(
                "Parameters file {} is valid with {} warning(s)",
                parameters.display(),
                parsed.warnings.len()
            );
            for warning in &parsed.warnings {
                println!("*  WARNING: {warning}");
            }
            Ok(())
        }
    }
}
