//! Mycovet: validates runnable code examples embedded in documentation.
//!
//! This is the main entry point for the `mycovet` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod analysis;
mod cli;
mod commands;
mod config;
mod corpus;
mod error;
mod exit_codes;
mod fixes;
mod interpreter;
mod pipeline;
mod record;
mod report;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
