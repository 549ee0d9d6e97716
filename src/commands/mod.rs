//! Command implementations for mycovet.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus console output shared by the commands.

mod analyze;
mod run;

use crate::analysis::Aggregate;
use crate::cli::Command;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Analyze(args) => analyze::cmd_analyze(args),
    }
}

/// Print the run summary to the console.
pub(crate) fn print_summary(aggregate: &Aggregate) {
    println!();
    println!("Total examples: {}", aggregate.total);
    println!("Successful: {}", aggregate.successful);
    println!("Failed: {}", aggregate.failed);
    println!("Success rate: {:.1}%", aggregate.success_rate());
    println!("Fixes applied: {}", aggregate.fixes_applied);

    if !aggregate.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for line in &aggregate.recommendations {
            println!("  {}", line);
        }
    }
    println!();
}
