//! Entry point for the `kbase` CLI.
//!
//! Parses arguments, sets up logging, dispatches to the command handler, and
//! maps errors to exit codes.

use kbase::cli::Cli;
use kbase::{commands, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // RUST_LOG wins; otherwise -v turns on debug output for kbase.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.global.verbose {
            "kbase=debug"
        } else {
            "kbase=warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
