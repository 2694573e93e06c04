use arg_report::cli::{run, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Load environment
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing for the CLI; logs go to stderr, results to stdout.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    match run(cli) {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("** ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}
