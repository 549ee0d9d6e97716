//! Report rendering and artifact output.
//!
//! Pure rendering over the aggregate and record set; nothing here mutates
//! pipeline data. Three artifacts per run:
//! - `VALIDATION_REPORT.md`: human-readable summary with per-class counts,
//!   the worst-failing files, and excerpted failures with verbatim
//!   diagnostics and source locations.
//! - `IMPROVEMENT_PLAN.md`: one prioritized section per non-zero failure
//!   bucket with fixed remediation guidance.
//! - `validation_records.json`: the complete record set plus run metadata,
//!   for CI gating and downstream tooling.
//!
//! A cancelled run renders an explicit partial-run banner instead of a
//! complete-looking report.

use crate::analysis::{Aggregate, ErrorClass, classify_record};
use crate::config::Config;
use crate::error::{Result, VetError};
use crate::record::ValidationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Report artifact file names.
pub const VALIDATION_REPORT_FILE: &str = "VALIDATION_REPORT.md";
pub const IMPROVEMENT_PLAN_FILE: &str = "IMPROVEMENT_PLAN.md";
pub const RECORDS_FILE: &str = "validation_records.json";

/// Run metadata attached to every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// When the report was generated (RFC3339).
    pub generated_at: DateTime<Utc>,
    /// Host that produced the run, `user@host`.
    pub host: String,
    /// Interpreter command the snippets ran against.
    pub interpreter: String,
    /// Per-snippet timeout in seconds.
    pub timeout_secs: u64,
    /// Snippets the extractor found.
    pub planned_total: usize,
    /// True when the run was cancelled before completing.
    pub partial: bool,
}

impl ReportMeta {
    pub fn new(interpreter: &str, timeout_secs: u64, planned_total: usize, partial: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            host: owner_string(),
            interpreter: interpreter.to_string(),
            timeout_secs,
            planned_total,
            partial,
        }
    }
}

/// `user@host` identity for report metadata.
fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// The machine-readable dump: metadata, summary, complete record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDump {
    pub meta: ReportMeta,
    pub summary: Aggregate,
    pub records: Vec<ValidationRecord>,
}

/// Render the human-readable validation summary.
pub fn render_validation_report(
    meta: &ReportMeta,
    aggregate: &Aggregate,
    records: &[ValidationRecord],
    config: &Config,
) -> String {
    let mut out = String::from("# Example Validation Report\n\n");

    push_partial_banner(&mut out, meta, aggregate);

    out.push_str(&format!("**Total Examples:** {}\n", aggregate.total));
    out.push_str(&format!("**Successful:** {}\n", aggregate.successful));
    out.push_str(&format!("**Failed:** {}\n", aggregate.failed));
    out.push_str(&format!("**Success Rate:** {:.1}%\n", aggregate.success_rate()));
    out.push_str(&format!("**Fixes Applied:** {}\n\n", aggregate.fixes_applied));

    if !aggregate.class_counts.is_empty() {
        out.push_str("## Failures by Class\n\n");
        for (class, count) in &aggregate.class_counts {
            out.push_str(&format!("- {}: {}\n", class, count));
        }
        out.push('\n');
    }

    if !aggregate.file_failures.is_empty() {
        out.push_str("## Files with Most Failures\n\n");
        for (file, count) in aggregate.file_failures.iter().take(config.top_files) {
            out.push_str(&format!("- {}: {} failures\n", file, count));
        }
        out.push('\n');
    }

    if !aggregate.pattern_failures.is_empty() {
        out.push_str("## Failure Patterns by Code Type\n\n");
        for (pattern, count) in &aggregate.pattern_failures {
            out.push_str(&format!("- {}: {} failures\n", pattern, count));
        }
        out.push('\n');
    }

    if !aggregate.recommendations.is_empty() {
        out.push_str("## Recommendations\n\n");
        for line in &aggregate.recommendations {
            out.push_str(&format!("{}\n", line));
        }
        out.push('\n');
    }

    let fixed: Vec<&ValidationRecord> = records
        .iter()
        .filter(|r| !r.is_failure() && !r.remediation.applied.is_empty())
        .take(5)
        .collect();
    if !fixed.is_empty() {
        out.push_str("## Successfully Fixed Examples\n\n");
        for record in fixed {
            out.push_str(&format!(
                "### {} (Block {})\n\n",
                record.snippet.file.display(),
                record.snippet.block
            ));
            out.push_str(&format!(
                "**Fixes Applied:** {}\n\n",
                record.remediation.applied.join(", ")
            ));
        }
    }

    let failing: Vec<&ValidationRecord> = records
        .iter()
        .filter(|r| r.is_failure())
        .take(config.failure_excerpts)
        .collect();
    if !failing.is_empty() {
        out.push_str("## Failed Examples\n\n");
        for record in failing {
            out.push_str(&format!(
                "### {} (Block {})\n\n",
                record.snippet.file.display(),
                record.snippet.block
            ));
            out.push_str(&format!("**Line:** {}\n\n", record.snippet.line));
            if let Some(class) = classify_record(record) {
                out.push_str(&format!("**Class:** {}\n\n", class));
            }
            out.push_str(&format!("**Error:** {}\n\n", record.outcome.stderr.trim()));
            if !record.remediation.applied.is_empty() {
                out.push_str(&format!(
                    "**Fixes Applied:** {}\n\n",
                    record.remediation.applied.join(", ")
                ));
            }
            out.push_str(&format!(
                "**Code:**\n```\n{}\n```\n\n",
                excerpt(&record.snippet.code, config.excerpt_chars)
            ));
        }
    }

    out.push_str(&format!(
        "---\nGenerated {} by {} against `{}` (timeout {}s)\n",
        meta.generated_at.to_rfc3339(),
        meta.host,
        meta.interpreter,
        meta.timeout_secs
    ));

    out
}

/// Guidance bullet lists for the improvement plan, per priority bucket.
fn plan_section(class: ErrorClass) -> (&'static str, &'static [&'static str]) {
    match class {
        ErrorClass::Timeout => (
            "Fix Timeout Issues",
            &[
                "Reduce complexity of examples",
                "Add proper timeout handling",
                "Break down complex examples into smaller parts",
            ],
        ),
        ErrorClass::EmptyOutput => (
            "Fix Empty Error Issues",
            &[
                "Investigate why examples produce no output",
                "Check for syntax errors in examples",
                "Ensure examples are complete and runnable",
            ],
        ),
        ErrorClass::ArgumentCountMismatch => (
            "Fix Function Signatures",
            &[
                "Update examples to match actual function signatures",
                "Verify function parameter requirements",
                "Update documentation to reflect correct usage",
            ],
        ),
        ErrorClass::TypeMismatch => (
            "Fix Type Issues",
            &[
                "Ensure examples use correct data types",
                "Add type checking to examples",
                "Update type requirements in documentation",
            ],
        ),
        ErrorClass::ServerFunctionError => (
            "Fix Server Examples",
            &[
                "Verify the server API used by examples",
                "Ensure server examples terminate deterministically",
                "Update server examples to the current factory signature",
            ],
        ),
        _ => ("Fix Remaining Failures", &["Review the per-record diagnostics"]),
    }
}

/// Priority order of plan sections; matches the recommendation buckets.
const PLAN_BUCKETS: [ErrorClass; 5] = [
    ErrorClass::Timeout,
    ErrorClass::EmptyOutput,
    ErrorClass::ArgumentCountMismatch,
    ErrorClass::TypeMismatch,
    ErrorClass::ServerFunctionError,
];

/// Render the structured improvement plan.
pub fn render_improvement_plan(meta: &ReportMeta, aggregate: &Aggregate) -> String {
    let mut out = String::from("# Documentation Improvement Plan\n\n");

    push_partial_banner(&mut out, meta, aggregate);

    out.push_str(&format!(
        "Based on validation analysis of {} examples.\n\n",
        aggregate.total
    ));

    out.push_str("## Current Status\n\n");
    out.push_str(&format!("- **Total Examples:** {}\n", aggregate.total));
    out.push_str(&format!("- **Successful:** {}\n", aggregate.successful));
    out.push_str(&format!("- **Failed:** {}\n", aggregate.failed));
    out.push_str(&format!("- **Success Rate:** {:.1}%\n\n", aggregate.success_rate()));

    out.push_str("## Priority Fixes\n\n");
    let mut section = 0;
    for class in PLAN_BUCKETS {
        let count = aggregate.class_count(class);
        if count == 0 {
            continue;
        }
        section += 1;
        let (title, bullets) = plan_section(class);
        out.push_str(&format!("### {}. {} ({} examples)\n", section, title, count));
        for bullet in bullets {
            out.push_str(&format!("- {}\n", bullet));
        }
        out.push('\n');
    }
    if section == 0 {
        out.push_str("No failing examples in the priority buckets.\n\n");
    }

    let other = aggregate.class_count(ErrorClass::Other);
    if other > 0 {
        out.push_str(&format!(
            "## Taxonomy Coverage\n\n{} failures fell to the Other bucket; \
             their diagnostics matched no known pattern and deserve a look.\n\n",
            other
        ));
    }

    out.push_str("## Implementation Steps\n\n");
    out.push_str("1. **Fix Critical Issues** - Address timeouts and empty errors first\n");
    out.push_str("2. **Update Function Signatures** - Ensure all examples use correct APIs\n");
    out.push_str("3. **Fix Type Issues** - Correct data type usage in examples\n");
    out.push_str("4. **Test Incrementally** - Validate fixes as they're applied\n");
    out.push_str("5. **Re-run Validation** - Ensure improvements are working\n\n");

    out.push_str("## Success Metrics\n\n");
    out.push_str("- Target: 90%+ success rate\n");
    out.push_str("- All critical examples working\n");
    out.push_str("- No timeout issues\n");
    out.push_str("- All function signatures correct\n");

    out
}

/// Serialize the machine-readable record dump.
pub fn render_records_json(dump: &RecordDump) -> Result<String> {
    serde_json::to_string_pretty(dump)
        .map_err(|e| VetError::ReportError(format!("failed to serialize records: {}", e)))
}

fn push_partial_banner(out: &mut String, meta: &ReportMeta, aggregate: &Aggregate) {
    if meta.partial {
        out.push_str(&format!(
            "> **Partial run:** cancelled after {} of {} snippets; \
             totals below cover only the executed subset.\n\n",
            aggregate.total, meta.planned_total
        ));
    }
}

/// Truncate code for an excerpt, on a character boundary.
fn excerpt(code: &str, max_chars: usize) -> String {
    if code.chars().count() <= max_chars {
        return code.to_string();
    }
    let cut: String = code.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Write all three artifacts to the output directory and return their paths.
pub fn write_artifacts(
    output_dir: &Path,
    meta: &ReportMeta,
    aggregate: &Aggregate,
    records: &[ValidationRecord],
    config: &Config,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        VetError::ReportError(format!(
            "failed to create output directory '{}': {}",
            output_dir.display(),
            e
        ))
    })?;

    let dump = RecordDump {
        meta: meta.clone(),
        summary: aggregate.clone(),
        records: records.to_vec(),
    };

    let artifacts = [
        (
            VALIDATION_REPORT_FILE,
            render_validation_report(meta, aggregate, records, config),
        ),
        (IMPROVEMENT_PLAN_FILE, render_improvement_plan(meta, aggregate)),
        (RECORDS_FILE, render_records_json(&dump)?),
    ];

    let mut paths = Vec::new();
    for (name, content) in artifacts {
        let path = output_dir.join(name);
        std::fs::write(&path, content).map_err(|e| {
            VetError::ReportError(format!("failed to write '{}': {}", path.display(), e))
        })?;
        paths.push(path);
    }

    Ok(paths)
}

/// Load a previously written record dump.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<RecordDump> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        VetError::UserError(format!(
            "failed to read records file '{}': {}\n\
             Fix: run `mycovet run` first to produce it.",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        VetError::UserError(format!(
            "failed to parse records file '{}': {}",
            path.display(),
            e
        ))
    })
}
