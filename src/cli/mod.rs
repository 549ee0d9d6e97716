//! CLI argument parsing for mycovet.
//!
//! Uses clap derive macros for declarative argument definitions. This module
//! defines the command structure; actual implementations are in the
//! `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Mycovet: validates runnable code examples embedded in documentation.
///
/// Scans a documentation tree for fenced code blocks, optionally applies
/// heuristic fixes for common example mistakes, executes each block against
/// the Myco interpreter under a timeout, and writes classified reports.
#[derive(Parser, Debug)]
#[command(name = "mycovet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for mycovet.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate every example in a documentation tree.
    ///
    /// Extracts tagged code blocks, remediates common issues, runs each
    /// against the interpreter, and writes the validation report, the
    /// improvement plan, and the machine-readable record dump.
    Run(RunArgs),

    /// Re-analyze a previous run's record dump.
    ///
    /// Recomputes the aggregate and rewrites the report artifacts from an
    /// existing validation_records.json, without executing anything.
    Analyze(AnalyzeArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Root of the documentation tree to scan.
    pub corpus_root: PathBuf,

    /// Interpreter command; the snippet file path is appended as the final
    /// argument (e.g. "myco" or "/opt/myco/bin/myco --quiet").
    #[arg(long, default_value = "myco")]
    pub interpreter: String,

    /// Per-snippet execution timeout in seconds.
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// Whether to apply the remediation chain before executing.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub apply_fixes: bool,

    /// Directory receiving the report artifacts.
    #[arg(long, default_value = "validation")]
    pub output_dir: PathBuf,

    /// Working directory for interpreter subprocesses
    /// (defaults to the corpus root).
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Number of concurrent interpreter invocations
    /// (overrides the config file).
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Language tag of the fenced blocks to extract
    /// (overrides the config file).
    #[arg(long)]
    pub language: Option<String>,

    /// Optional YAML config file with tuning values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the `analyze` command.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Path to a validation_records.json from a previous run.
    pub records: PathBuf,

    /// Directory receiving the regenerated artifacts
    /// (defaults to the records file's directory).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Optional YAML config file with tuning values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::try_parse_from(["mycovet", "run", "docs"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.corpus_root, PathBuf::from("docs"));
            assert_eq!(args.interpreter, "myco");
            assert_eq!(args.timeout, 5);
            assert!(args.apply_fixes);
            assert_eq!(args.output_dir, PathBuf::from("validation"));
            assert!(args.jobs.is_none());
            assert!(args.language.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_disable_fixes() {
        let cli = Cli::try_parse_from(["mycovet", "run", "docs", "--apply-fixes=false"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert!(!args.apply_fixes);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "mycovet",
            "run",
            "docs",
            "--interpreter",
            "/opt/myco/bin/myco --quiet",
            "--timeout",
            "30",
            "--jobs",
            "8",
            "--language",
            "demo",
            "--output-dir",
            "out",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.interpreter, "/opt/myco/bin/myco --quiet");
            assert_eq!(args.timeout, 30);
            assert_eq!(args.jobs, Some(8));
            assert_eq!(args.language.as_deref(), Some("demo"));
            assert_eq!(args.output_dir, PathBuf::from("out"));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_analyze() {
        let cli =
            Cli::try_parse_from(["mycovet", "analyze", "out/validation_records.json"]).unwrap();
        if let Command::Analyze(args) = cli.command {
            assert_eq!(args.records, PathBuf::from("out/validation_records.json"));
            assert!(args.output_dir.is_none());
        } else {
            panic!("Expected Analyze command");
        }
    }

    #[test]
    fn run_requires_corpus_root() {
        assert!(Cli::try_parse_from(["mycovet", "run"]).is_err());
    }
}
