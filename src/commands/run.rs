//! The `run` command: full validation pipeline over a documentation tree.

use crate::cli::RunArgs;
use crate::commands::print_summary;
use crate::config::{Config, RunSettings};
use crate::error::Result;
use crate::pipeline::{CancelToken, run_validation};
use crate::report::{ReportMeta, write_artifacts};
use std::time::Duration;

pub fn cmd_run(args: RunArgs) -> Result<()> {
    let settings = build_settings(&args)?;
    // Infrastructure problems abort here, before any report exists that
    // could misrepresent completeness.
    settings.validate()?;

    println!(
        "Validating '{}' examples under '{}'...",
        settings.config.language,
        settings.corpus_root.display()
    );

    let cancel = CancelToken::new();
    let result = run_validation(&settings, &cancel)?;

    println!(
        "Executed {} of {} snippets{}",
        result.records.len(),
        result.planned_total,
        if result.partial { " (partial run)" } else { "" }
    );

    let aggregate = crate::analysis::aggregate(&result.records, result.partial);
    let meta = ReportMeta::new(
        &settings.interpreter,
        settings.timeout.as_secs(),
        result.planned_total,
        result.partial,
    );

    let paths = write_artifacts(
        &settings.output_dir,
        &meta,
        &aggregate,
        &result.records,
        &settings.config,
    )?;

    print_summary(&aggregate);
    for path in paths {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Merge CLI arguments over the optional config file into run settings.
fn build_settings(args: &RunArgs) -> Result<RunSettings> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }

    Ok(RunSettings {
        corpus_root: args.corpus_root.clone(),
        interpreter: args.interpreter.clone(),
        workdir: args
            .workdir
            .clone()
            .unwrap_or_else(|| args.corpus_root.clone()),
        timeout: Duration::from_secs(args.timeout),
        apply_fixes: args.apply_fixes,
        output_dir: args.output_dir.clone(),
        config,
    })
}
