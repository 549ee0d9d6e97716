//! Configuration for mycovet.
//!
//! Two layers:
//! - [`Config`]: tuning values loadable from an optional YAML file
//!   (fence language tag, include globs, worker count, report sizes).
//!   Unknown fields are ignored for forward compatibility.
//! - [`RunSettings`]: the explicit per-run state (corpus root, interpreter
//!   command, working directory, timeout, output directory). Every stage
//!   receives these values as arguments; no component reads ambient process
//!   state such as the current directory.

use crate::error::{Result, VetError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning configuration, optionally loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language tag on fenced code blocks to extract (```<tag>).
    pub language: String,

    /// Glob patterns selecting documentation files under the corpus root.
    pub include_globs: Vec<String>,

    /// Number of concurrent interpreter invocations.
    pub jobs: usize,

    /// How many files to list in the per-file failure ranking.
    pub top_files: usize,

    /// How many failing records to excerpt in the report.
    pub failure_excerpts: usize,

    /// Maximum characters of snippet code shown per excerpted failure.
    pub excerpt_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "myco".to_string(),
            include_globs: vec!["**/*.md".to_string()],
            jobs: 4,
            top_files: 10,
            failure_excerpts: 10,
            excerpt_chars: 100,
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            VetError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| VetError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// Rules:
    /// - `language` must be non-empty and contain no whitespace
    /// - `include_globs` must be non-empty and each pattern must compile
    /// - `jobs` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.language.is_empty() || self.language.contains(char::is_whitespace) {
            return Err(VetError::UserError(format!(
                "config validation failed: language must be a single non-empty fence tag (found '{}')",
                self.language
            )));
        }

        if self.include_globs.is_empty() {
            return Err(VetError::UserError(
                "config validation failed: include_globs must not be empty".to_string(),
            ));
        }
        self.build_include_set()?;

        if self.jobs == 0 {
            return Err(VetError::UserError(
                "config validation failed: jobs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Compile the include globs into a matcher.
    pub fn build_include_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in &self.include_globs {
            let normalized = pattern.trim().replace('\\', "/");
            if normalized.is_empty() {
                continue;
            }
            let glob = Glob::new(&normalized).map_err(|e| {
                VetError::UserError(format!(
                    "invalid glob in include_globs: '{}' - {}\n\
                     Fix: correct or remove this pattern.",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }

        builder.build().map_err(|e| {
            VetError::UserError(format!("failed to build include glob set: {}", e))
        })
    }
}

/// Explicit per-run state threaded through every pipeline stage.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Root of the documentation tree to scan.
    pub corpus_root: PathBuf,

    /// Interpreter command string (shell-words parsed; the snippet file
    /// path is appended as the final argument).
    pub interpreter: String,

    /// Working directory for interpreter subprocesses.
    pub workdir: PathBuf,

    /// Per-snippet wall-clock execution bound.
    pub timeout: Duration,

    /// Whether to apply the remediation chain before execution.
    pub apply_fixes: bool,

    /// Directory receiving the report artifacts.
    pub output_dir: PathBuf,

    /// Tuning configuration.
    pub config: Config,
}

impl RunSettings {
    /// Validate the run environment before doing any work.
    ///
    /// Infrastructure errors are fatal here, before a report could be
    /// produced that would misrepresent completeness:
    /// - the corpus root must be a readable directory
    /// - the interpreter command must be non-empty and its program locatable
    /// - the timeout must be positive
    pub fn validate(&self) -> Result<()> {
        if !self.corpus_root.is_dir() {
            return Err(VetError::UserError(format!(
                "corpus root '{}' is not a directory\n\
                 Fix: pass the root of the documentation tree to scan.",
                self.corpus_root.display()
            )));
        }

        let args = shell_words::split(&self.interpreter).map_err(|e| {
            VetError::UserError(format!(
                "failed to parse interpreter command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.interpreter, e
            ))
        })?;
        let program = args.first().ok_or_else(|| {
            VetError::UserError("interpreter command is empty".to_string())
        })?;
        if resolve_program(program).is_none() {
            return Err(VetError::UserError(format!(
                "interpreter '{}' not found\n\
                 Fix: pass a path to the interpreter binary or ensure it is in PATH.",
                program
            )));
        }

        if self.timeout.is_zero() {
            return Err(VetError::UserError(
                "timeout must be greater than 0 seconds".to_string(),
            ));
        }

        self.config.validate()
    }
}

/// Locate a program: a name containing a path separator is checked against
/// the current directory, anything else is searched for in PATH.
///
/// Returns an absolute path. Subprocesses run with a different working
/// directory, where a relative program name would resolve somewhere else
/// entirely, so the resolved path is what gets spawned.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        if !candidate.is_file() {
            return None;
        }
        return std::path::absolute(candidate).ok();
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let full = dir.join(program);
        if full.is_file() {
            return std::path::absolute(full).ok();
        }
    }
    None
}
