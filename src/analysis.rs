//! Failure classification and aggregate analysis.
//!
//! Operates on the complete record set of a run, strictly after all
//! executions finish. Classification is a declarative ordered table of
//! (predicate, class) pairs over a failing record's stderr; the first match
//! wins and evaluation stops. The taxonomy is total: anything unmatched
//! falls to [`ErrorClass::Other`], which the report surfaces rather than
//! drops — an `Other` bucket is a coverage gap in the taxonomy, not noise.

use crate::interpreter::TIMEOUT_SENTINEL;
use crate::record::ValidationRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Taxonomy tag for a failing record. Assigned only to failures; total and
/// deterministic over stderr text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Timeout,
    EmptyOutput,
    ArgumentCountMismatch,
    TypeMismatch,
    ServerFunctionError,
    MethodNotFound,
    FunctionSignatureMismatch,
    TypeRequirementError,
    Other,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorClass::Timeout => "Timeout",
            ErrorClass::EmptyOutput => "Empty output",
            ErrorClass::ArgumentCountMismatch => "Argument count mismatch",
            ErrorClass::TypeMismatch => "Type mismatch",
            ErrorClass::ServerFunctionError => "Server function error",
            ErrorClass::MethodNotFound => "Method not found",
            ErrorClass::FunctionSignatureMismatch => "Function signature mismatch",
            ErrorClass::TypeRequirementError => "Type requirement error",
            ErrorClass::Other => "Other errors",
        };
        f.write_str(label)
    }
}

/// One row of the classification table.
pub struct ClassRule {
    pub class: ErrorClass,
    matches: fn(&str) -> bool,
}

/// The ordered classification table. Top-down, first match wins. The
/// timeout sentinel outranks everything; diagnostic-code markers outrank
/// the looser phrase markers.
pub fn classification_table() -> &'static [ClassRule] {
    static TABLE: [ClassRule; 8] = [
        ClassRule {
            class: ErrorClass::Timeout,
            matches: |stderr| stderr.contains(TIMEOUT_SENTINEL),
        },
        ClassRule {
            class: ErrorClass::EmptyOutput,
            matches: |stderr| stderr.trim().is_empty(),
        },
        ClassRule {
            class: ErrorClass::ArgumentCountMismatch,
            matches: |stderr| stderr.contains("E3005"),
        },
        ClassRule {
            class: ErrorClass::TypeMismatch,
            matches: |stderr| stderr.contains("E3004"),
        },
        ClassRule {
            class: ErrorClass::ServerFunctionError,
            matches: |stderr| stderr.contains("E5001"),
        },
        ClassRule {
            class: ErrorClass::MethodNotFound,
            matches: |stderr| stderr.contains("E9008"),
        },
        ClassRule {
            class: ErrorClass::FunctionSignatureMismatch,
            matches: |stderr| stderr.contains("requires exactly"),
        },
        ClassRule {
            class: ErrorClass::TypeRequirementError,
            matches: |stderr| stderr.contains("must be a"),
        },
    ];
    &TABLE
}

/// Classify a failing record's stderr. Total: falls back to `Other`.
pub fn classify(stderr: &str) -> ErrorClass {
    for rule in classification_table() {
        if (rule.matches)(stderr) {
            return rule.class;
        }
    }
    ErrorClass::Other
}

/// Classify a record: failing records get exactly one class, successes none.
pub fn classify_record(record: &ValidationRecord) -> Option<ErrorClass> {
    record
        .is_failure()
        .then(|| classify(&record.outcome.stderr))
}

/// Shape of code a failing snippet represents, for the pattern breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePattern {
    Server,
    Class,
    Function,
    Loop,
    Conditional,
    Variable,
}

impl std::fmt::Display for CodePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CodePattern::Server => "Server examples",
            CodePattern::Class => "Class examples",
            CodePattern::Function => "Function examples",
            CodePattern::Loop => "Loop examples",
            CodePattern::Conditional => "Conditional examples",
            CodePattern::Variable => "Variable examples",
        };
        f.write_str(label)
    }
}

/// Ordered marker table for code patterns; first match wins.
const PATTERN_MARKERS: [(&str, CodePattern); 6] = [
    ("server.create", CodePattern::Server),
    ("class ", CodePattern::Class),
    ("func ", CodePattern::Function),
    ("while ", CodePattern::Loop),
    ("if ", CodePattern::Conditional),
    ("let ", CodePattern::Variable),
];

/// Identify the dominant code pattern of a snippet's (remediated) text.
pub fn code_pattern(code: &str) -> Option<CodePattern> {
    PATTERN_MARKERS
        .iter()
        .find(|(marker, _)| code.contains(marker))
        .map(|(_, pattern)| *pattern)
}

/// Derived summary statistics for one run. Recomputed from the full record
/// set each run; never persisted incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Total number of remediation fixes recorded across all records.
    pub fixes_applied: usize,
    /// Per-class failure counts, ranked descending, non-zero only.
    pub class_counts: Vec<(ErrorClass, usize)>,
    /// Per-source-file failure counts, ranked descending, complete (the
    /// report truncates for display; the sum equals `failed`).
    pub file_failures: Vec<(String, usize)>,
    /// Per-code-pattern failure counts over remediated text, ranked.
    pub pattern_failures: Vec<(CodePattern, usize)>,
    /// Prioritized recommendation lines, one per non-zero priority bucket.
    pub recommendations: Vec<String>,
    /// True when the run was cancelled before every snippet executed.
    pub partial: bool,
}

impl Aggregate {
    /// Count for one error class (zero when absent).
    pub fn class_count(&self, class: ErrorClass) -> usize {
        self.class_counts
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64 * 100.0
        }
    }
}

/// Priority order of the recommendation buckets.
const RECOMMENDATION_BUCKETS: [ErrorClass; 5] = [
    ErrorClass::Timeout,
    ErrorClass::EmptyOutput,
    ErrorClass::ArgumentCountMismatch,
    ErrorClass::TypeMismatch,
    ErrorClass::ServerFunctionError,
];

fn recommendation_text(class: ErrorClass, count: usize) -> String {
    match class {
        ErrorClass::Timeout => format!(
            "{} examples timed out - consider reducing complexity or adding timeouts",
            count
        ),
        ErrorClass::EmptyOutput => format!(
            "{} examples had empty errors - investigate execution issues",
            count
        ),
        ErrorClass::ArgumentCountMismatch => format!(
            "{} examples have argument count issues - update function signatures",
            count
        ),
        ErrorClass::TypeMismatch => {
            format!("{} examples have type issues - fix type requirements", count)
        }
        ErrorClass::ServerFunctionError => {
            format!("{} server examples failed - fix server API", count)
        }
        _ => format!("{} examples failed with {}", count, class),
    }
}

/// Compute the aggregate over a run's complete record set.
pub fn aggregate(records: &[ValidationRecord], partial: bool) -> Aggregate {
    let total = records.len();
    let successful = records.iter().filter(|r| !r.is_failure()).count();
    let failed = total - successful;
    let fixes_applied = records.iter().map(|r| r.remediation.applied.len()).sum();

    let mut class_map: BTreeMap<ErrorClass, usize> = BTreeMap::new();
    let mut file_map: BTreeMap<String, usize> = BTreeMap::new();
    let mut pattern_map: BTreeMap<CodePattern, usize> = BTreeMap::new();

    for record in records.iter().filter(|r| r.is_failure()) {
        if let Some(class) = classify_record(record) {
            *class_map.entry(class).or_default() += 1;
        }
        *file_map
            .entry(record.snippet.file.display().to_string())
            .or_default() += 1;
        if let Some(pattern) = code_pattern(&record.remediation.code) {
            *pattern_map.entry(pattern).or_default() += 1;
        }
    }

    let recommendations = RECOMMENDATION_BUCKETS
        .iter()
        .filter_map(|&class| {
            let count = *class_map.get(&class).unwrap_or(&0);
            (count > 0).then(|| recommendation_text(class, count))
        })
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text))
        .collect();

    Aggregate {
        total,
        successful,
        failed,
        fixes_applied,
        class_counts: ranked(class_map),
        file_failures: ranked(file_map),
        pattern_failures: ranked(pattern_map),
        recommendations,
        partial,
    }
}

/// Rank a counter descending by count, tie-broken by key for determinism.
fn ranked<K: Ord>(map: BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = map.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Snippet;
    use crate::fixes::RemediationResult;
    use crate::interpreter::{ExitStatus, Outcome};
    use std::path::PathBuf;
    use std::time::Duration;

    fn record(file: &str, code: &str, success: bool, stderr: &str) -> ValidationRecord {
        ValidationRecord {
            snippet: Snippet {
                file: PathBuf::from(file),
                block: 1,
                line: 2,
                code: code.to_string(),
            },
            remediation: RemediationResult {
                code: code.to_string(),
                applied: Vec::new(),
            },
            outcome: Outcome {
                success,
                stdout: String::new(),
                stderr: stderr.to_string(),
                status: if success {
                    ExitStatus::Code(0)
                } else {
                    ExitStatus::Code(1)
                },
                duration: Duration::from_millis(1),
            },
        }
    }

    #[test]
    fn timeout_sentinel_outranks_everything() {
        let stderr = format!("{} and also E3005", TIMEOUT_SENTINEL);
        assert_eq!(classify(&stderr), ErrorClass::Timeout);
    }

    #[test]
    fn blank_stderr_is_empty_output() {
        assert_eq!(classify("   \n"), ErrorClass::EmptyOutput);
    }

    #[test]
    fn diagnostic_code_markers_map_to_their_classes() {
        assert_eq!(classify("Error E3005: bad arity"), ErrorClass::ArgumentCountMismatch);
        assert_eq!(classify("Error E3004: bad type"), ErrorClass::TypeMismatch);
        assert_eq!(classify("Error E5001: server"), ErrorClass::ServerFunctionError);
        assert_eq!(classify("Error E9008: no method"), ErrorClass::MethodNotFound);
    }

    #[test]
    fn phrase_markers_map_to_their_classes() {
        assert_eq!(
            classify("foo requires exactly 2 arguments"),
            ErrorClass::FunctionSignatureMismatch
        );
        assert_eq!(classify("argument must be a number"), ErrorClass::TypeRequirementError);
    }

    #[test]
    fn higher_priority_marker_wins_over_phrase() {
        // Both an argument-count code and a generic phrase marker present.
        assert_eq!(
            classify("E3005: add() requires exactly 2 arguments"),
            ErrorClass::ArgumentCountMismatch
        );
    }

    #[test]
    fn unmatched_stderr_falls_to_other() {
        assert_eq!(classify("segfault somewhere"), ErrorClass::Other);
    }

    #[test]
    fn successes_are_never_classified() {
        let rec = record("doc.md", "print(\"hi\");", true, "");
        assert_eq!(classify_record(&rec), None);
    }

    #[test]
    fn code_pattern_priority_is_fixed() {
        // A server snippet that also declares variables counts as Server.
        let code = "let app = server.create();\napp.listen();";
        assert_eq!(code_pattern(code), Some(CodePattern::Server));

        assert_eq!(code_pattern("func add(a, b):\n  return a + b;\nend"), Some(CodePattern::Function));
        assert_eq!(code_pattern("let x = 1;"), Some(CodePattern::Variable));
        assert_eq!(code_pattern("42;"), None);
    }

    #[test]
    fn aggregate_counts_are_consistent() {
        let records = vec![
            record("a.md", "print(\"ok\");", true, ""),
            record("a.md", "add(1)", false, "E3005: wrong arity"),
            record("b.md", "let x = 1;", false, ""),
            record("b.md", "while true: end", false, TIMEOUT_SENTINEL),
        ];

        let agg = aggregate(&records, false);
        assert_eq!(agg.total, 4);
        assert_eq!(agg.successful, 1);
        assert_eq!(agg.failed, 3);
        assert_eq!(agg.successful + agg.failed, agg.total);

        // Per-file counts sum to the failure count.
        let file_sum: usize = agg.file_failures.iter().map(|(_, n)| n).sum();
        assert_eq!(file_sum, agg.failed);

        assert_eq!(agg.class_count(ErrorClass::ArgumentCountMismatch), 1);
        assert_eq!(agg.class_count(ErrorClass::EmptyOutput), 1);
        assert_eq!(agg.class_count(ErrorClass::Timeout), 1);
    }

    #[test]
    fn file_failures_rank_descending() {
        let records = vec![
            record("often.md", "x", false, "boom"),
            record("often.md", "y", false, "boom"),
            record("rare.md", "z", false, "boom"),
        ];

        let agg = aggregate(&records, false);
        assert_eq!(agg.file_failures[0], ("often.md".to_string(), 2));
        assert_eq!(agg.file_failures[1], ("rare.md".to_string(), 1));
    }

    #[test]
    fn recommendations_cover_only_nonzero_buckets_in_priority_order() {
        let records = vec![
            record("a.md", "add(1)", false, "E3005: arity"),
            record("b.md", "while true: end", false, TIMEOUT_SENTINEL),
        ];

        let agg = aggregate(&records, false);
        assert_eq!(agg.recommendations.len(), 2);
        assert!(agg.recommendations[0].starts_with("1. "));
        assert!(agg.recommendations[0].contains("timed out"));
        assert!(agg.recommendations[1].starts_with("2. "));
        assert!(agg.recommendations[1].contains("argument count"));
    }

    #[test]
    fn fixes_applied_sums_across_records() {
        let mut rec = record("a.md", "x = 1", false, "boom");
        rec.remediation.applied = vec![
            "Added missing semicolon".to_string(),
            "Added missing let declarations".to_string(),
        ];

        let agg = aggregate(&[rec], false);
        assert_eq!(agg.fixes_applied, 2);
    }

    #[test]
    fn empty_run_aggregates_to_zeroes() {
        let agg = aggregate(&[], false);
        assert_eq!(agg.total, 0);
        assert_eq!(agg.success_rate(), 0.0);
        assert!(agg.recommendations.is_empty());
    }

    #[test]
    fn partial_flag_is_carried() {
        assert!(aggregate(&[], true).partial);
        assert!(!aggregate(&[], false).partial);
    }
}
