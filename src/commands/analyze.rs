//! The `analyze` command: recompute the analysis from a prior record dump.
//!
//! Useful when the taxonomy or report rendering changes: the snippets are
//! not re-executed, the stored records are re-classified and the markdown
//! artifacts rewritten.

use crate::cli::AnalyzeArgs;
use crate::commands::print_summary;
use crate::config::Config;
use crate::error::{Result, VetError};
use crate::report::{load_records, write_artifacts};

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let dump = load_records(&args.records)?;

    let output_dir = match args.output_dir {
        Some(dir) => dir,
        None => args
            .records
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                VetError::UserError(format!(
                    "cannot determine output directory from '{}'\n\
                     Fix: pass --output-dir explicitly.",
                    args.records.display()
                ))
            })?,
    };

    // Fresh aggregate over the stored records; the partial flag travels
    // with the dump so a partial run stays marked partial.
    let aggregate = crate::analysis::aggregate(&dump.records, dump.meta.partial);

    let mut meta = dump.meta.clone();
    meta.generated_at = chrono::Utc::now();

    let paths = write_artifacts(&output_dir, &meta, &aggregate, &dump.records, &config)?;

    print_summary(&aggregate);
    for path in paths {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::corpus::Snippet;
    use crate::fixes::RemediationResult;
    use crate::interpreter::{ExitStatus, Outcome};
    use crate::record::ValidationRecord;
    use crate::report::{RECORDS_FILE, RecordDump, ReportMeta, render_records_json};
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_dump() -> RecordDump {
        let records = vec![ValidationRecord {
            snippet: Snippet {
                file: "doc.md".into(),
                block: 1,
                line: 2,
                code: "add(1)".to_string(),
            },
            remediation: RemediationResult {
                code: "add(1);".to_string(),
                applied: vec!["Added missing semicolon".to_string()],
            },
            outcome: Outcome {
                success: false,
                stdout: String::new(),
                stderr: "E3005: wrong arity".to_string(),
                status: ExitStatus::Code(1),
                duration: Duration::from_millis(4),
            },
        }];
        let summary = aggregate(&records, false);
        RecordDump {
            meta: ReportMeta::new("myco", 5, 1, false),
            summary,
            records,
        }
    }

    #[test]
    fn analyze_regenerates_artifacts_next_to_the_dump() {
        let temp = TempDir::new().unwrap();
        let dump_path = temp.path().join(RECORDS_FILE);
        std::fs::write(&dump_path, render_records_json(&sample_dump()).unwrap()).unwrap();

        cmd_analyze(AnalyzeArgs {
            records: dump_path,
            output_dir: None,
            config: None,
        })
        .unwrap();

        assert!(temp.path().join("VALIDATION_REPORT.md").exists());
        assert!(temp.path().join("IMPROVEMENT_PLAN.md").exists());

        let report =
            std::fs::read_to_string(temp.path().join("VALIDATION_REPORT.md")).unwrap();
        assert!(report.contains("Argument count mismatch: 1"));
    }

    #[test]
    fn analyze_rejects_missing_dump() {
        let temp = TempDir::new().unwrap();
        let err = cmd_analyze(AnalyzeArgs {
            records: temp.path().join("nope.json"),
            output_dir: None,
            config: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed to read records file"));
    }
}
