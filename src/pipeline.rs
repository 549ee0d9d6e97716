//! The validation pipeline: extract, remediate, execute, collect.
//!
//! Extraction is a sequential directory pass. Remediation and execution run
//! per snippet on a bounded worker pool; each execution owns a private temp
//! file and subprocess, so workers share nothing mutable beyond the
//! read-only settings. Aggregation and reporting happen strictly after the
//! pool drains (a barrier) and live in `analysis`/`report`.
//!
//! A [`CancelToken`] stops the run: no new executions launch, in-flight
//! subprocesses are killed best-effort, and the result is marked partial so
//! the report cannot pass itself off as complete.

use crate::config::RunSettings;
use crate::corpus::{Extractor, Snippet};
use crate::error::Result;
use crate::fixes;
use crate::interpreter::Runner;
use crate::record::ValidationRecord;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared cancellation flag. Cheap to clone; trip once, observed everywhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What a run produced: records for every executed snippet, plus enough to
/// tell whether the run covered the whole corpus.
#[derive(Debug)]
pub struct RunResult {
    /// One record per executed snippet, ordered by (file, block).
    pub records: Vec<ValidationRecord>,
    /// Snippets the extractor found.
    pub planned_total: usize,
    /// True when cancellation stopped the run early.
    pub partial: bool,
}

/// Run the full extract → remediate → execute pipeline.
///
/// Per-snippet failures (non-zero exit, timeout, launch failure) become
/// failed records and never abort the run; only an unreadable corpus root
/// is an error here.
pub fn run_validation(settings: &RunSettings, cancel: &CancelToken) -> Result<RunResult> {
    let extractor = Extractor::new(&settings.corpus_root, &settings.config)?;
    let snippets: Vec<Snippet> = extractor.snippets()?.collect();
    let planned_total = snippets.len();

    let runner = Runner::from_settings(settings)?;
    let mut records = execute_all(
        &snippets,
        &runner,
        settings.apply_fixes,
        settings.config.jobs,
        cancel,
    );

    records.sort_by(|a, b| {
        (&a.snippet.file, a.snippet.block).cmp(&(&b.snippet.file, b.snippet.block))
    });

    Ok(RunResult {
        records,
        planned_total,
        partial: cancel.is_cancelled(),
    })
}

/// Drain the snippet list through a bounded worker pool.
fn execute_all(
    snippets: &[Snippet],
    runner: &Runner,
    apply_fixes: bool,
    jobs: usize,
    cancel: &CancelToken,
) -> Vec<ValidationRecord> {
    let cursor = AtomicUsize::new(0);
    let records: Mutex<Vec<ValidationRecord>> = Mutex::new(Vec::with_capacity(snippets.len()));
    let workers = jobs.max(1).min(snippets.len().max(1));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(snippet) = snippets.get(index) else {
                        break;
                    };

                    let remediation = if apply_fixes {
                        fixes::remediate(&snippet.code)
                    } else {
                        fixes::unremediated(&snippet.code)
                    };

                    // A cancelled wait yields no outcome and no record.
                    let Some(outcome) = runner.execute(&remediation.code, cancel) else {
                        break;
                    };

                    let record = ValidationRecord {
                        snippet: snippet.clone(),
                        remediation,
                        outcome,
                    };
                    if let Ok(mut guard) = records.lock() {
                        guard.push(record);
                    }
                }
            });
        }
    });

    records.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ErrorClass, aggregate, classify_record};
    use crate::config::Config;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn write_doc(temp: &TempDir, rel: &str, blocks: &[&str]) {
        let mut content = String::new();
        for block in blocks {
            content.push_str(&format!("```myco\n{}\n```\n\n", block));
        }
        let path = temp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[cfg(unix)]
    fn sh_settings(temp: &TempDir, timeout: Duration) -> RunSettings {
        RunSettings {
            corpus_root: temp.path().to_path_buf(),
            interpreter: "sh".to_string(),
            workdir: temp.path().to_path_buf(),
            timeout,
            apply_fixes: true,
            output_dir: temp.path().join("out"),
            config: Config::default(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn end_to_end_run_produces_one_record_per_snippet() {
        let temp = TempDir::new().unwrap();
        write_doc(&temp, "good.md", &["echo ok;"]);
        write_doc(&temp, "bad.md", &["echo 'E3005: wrong arity' >&2; exit 1;"]);

        let settings = sh_settings(&temp, Duration::from_secs(10));
        let result = run_validation(&settings, &CancelToken::new()).unwrap();

        assert_eq!(result.planned_total, 2);
        assert_eq!(result.records.len(), 2);
        assert!(!result.partial);

        // Sorted by file: bad.md before good.md.
        assert_eq!(result.records[0].snippet.file.to_string_lossy(), "bad.md");
        assert!(result.records[0].is_failure());
        assert_eq!(
            classify_record(&result.records[0]),
            Some(ErrorClass::ArgumentCountMismatch)
        );
        assert!(!result.records[1].is_failure());

        let agg = aggregate(&result.records, result.partial);
        assert_eq!(agg.successful + agg.failed, agg.total);
    }

    #[cfg(unix)]
    #[test]
    fn scenario_a_missing_terminator_is_fixed_and_succeeds() {
        let temp = TempDir::new().unwrap();
        write_doc(&temp, "doc.md", &["echo hi"]);

        let settings = sh_settings(&temp, Duration::from_secs(10));
        let result = run_validation(&settings, &CancelToken::new()).unwrap();

        let record = &result.records[0];
        assert_eq!(record.remediation.code, "echo hi;");
        assert_eq!(
            record.remediation.applied,
            vec!["Added missing semicolon".to_string()]
        );
        assert!(!record.is_failure());
    }

    #[cfg(unix)]
    #[test]
    fn scenario_b_instrumented_loop_still_times_out() {
        let temp = TempDir::new().unwrap();
        // An unbounded loop with no output statement: the loop rule fires,
        // but instrumentation aids diagnosis, it does not terminate the loop.
        write_doc(&temp, "loop.md", &["while true; do :; done"]);

        let mut settings = sh_settings(&temp, Duration::from_secs(1));
        settings.config.jobs = 1;

        let start = Instant::now();
        let result = run_validation(&settings, &CancelToken::new()).unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));

        let record = &result.records[0];
        assert!(
            record
                .remediation
                .applied
                .iter()
                .any(|f| f.contains("infinite loops"))
        );
        assert!(record.is_failure());
        assert_eq!(classify_record(record), Some(ErrorClass::Timeout));
    }

    #[cfg(unix)]
    #[test]
    fn fixes_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        write_doc(&temp, "doc.md", &["echo hi"]);

        let mut settings = sh_settings(&temp, Duration::from_secs(10));
        settings.apply_fixes = false;

        let result = run_validation(&settings, &CancelToken::new()).unwrap();
        let record = &result.records[0];
        assert_eq!(record.remediation.code, "echo hi");
        assert!(record.remediation.applied.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn pre_cancelled_run_is_partial_and_launches_nothing() {
        let temp = TempDir::new().unwrap();
        write_doc(&temp, "doc.md", &["echo hi;", "echo there;"]);

        let settings = sh_settings(&temp, Duration::from_secs(10));
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = run_validation(&settings, &cancel).unwrap();
        assert!(result.partial);
        assert_eq!(result.planned_total, 2);
        assert!(result.records.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn mid_run_cancellation_kills_in_flight_work() {
        let temp = TempDir::new().unwrap();
        write_doc(&temp, "slow.md", &["sleep 30;"]);

        let mut settings = sh_settings(&temp, Duration::from_secs(30));
        settings.config.jobs = 1;

        let cancel = CancelToken::new();
        let start = Instant::now();

        let result = std::thread::scope(|scope| {
            let trip = cancel.clone();
            scope.spawn(move || {
                std::thread::sleep(Duration::from_millis(300));
                trip.cancel();
            });
            run_validation(&settings, &cancel).unwrap()
        });

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(result.partial);
        assert!(result.records.is_empty());
    }

    #[test]
    fn empty_corpus_yields_an_empty_complete_run() {
        let temp = TempDir::new().unwrap();

        let settings = RunSettings {
            corpus_root: temp.path().to_path_buf(),
            interpreter: "definitely_not_launched".to_string(),
            workdir: temp.path().to_path_buf(),
            timeout: Duration::from_secs(1),
            apply_fixes: true,
            output_dir: temp.path().join("out"),
            config: Config::default(),
        };

        let result = run_validation(&settings, &CancelToken::new()).unwrap();
        assert_eq!(result.planned_total, 0);
        assert!(result.records.is_empty());
        assert!(!result.partial);
    }
}
