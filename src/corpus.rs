//! Snippet extraction from a documentation tree.
//!
//! Recursively scans the corpus root for documentation files (selected by
//! the configured include globs), then pulls out fenced code blocks tagged
//! with the target language. Each snippet carries its source provenance:
//! file path, 1-based block index within the file, and the 1-based line of
//! the first code line (the line following the opening fence).
//!
//! Extraction is a lazy, restartable sequence: [`Extractor::snippets`]
//! returns a fresh iterator each time, and file contents are only read as
//! the iterator advances. Unreadable files are skipped with a warning;
//! they never abort the run.

use crate::config::Config;
use crate::error::{Result, VetError};
use globset::GlobSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// A fenced code block extracted from documentation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Source file, relative to the corpus root.
    pub file: PathBuf,
    /// 1-based index of this block among the file's extracted blocks.
    pub block: usize,
    /// 1-based line number of the first code line.
    pub line: usize,
    /// The block's code, fence markers excluded, surrounding whitespace trimmed.
    pub code: String,
}

/// Scans a corpus root for documentation files and extracts tagged blocks.
pub struct Extractor {
    root: PathBuf,
    include: GlobSet,
    fence: Regex,
}

impl Extractor {
    /// Build an extractor for the given corpus root and configuration.
    pub fn new(root: &Path, config: &Config) -> Result<Self> {
        let pattern = format!(r"(?s)```{}\n(.*?)\n```", regex::escape(&config.language));
        let fence = Regex::new(&pattern).map_err(|e| {
            VetError::UserError(format!(
                "failed to compile fence pattern for language '{}': {}",
                config.language, e
            ))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            include: config.build_include_set()?,
            fence,
        })
    }

    /// Collect the documentation files under the root, sorted for
    /// deterministic ordering.
    pub fn documentation_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files(&self.root, &mut files)?;
        files.sort();

        files.retain(|path| {
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            self.include.is_match(rel.to_string_lossy().replace('\\', "/"))
        });

        Ok(files)
    }

    /// Start a fresh lazy pass over the corpus.
    pub fn snippets(&self) -> Result<SnippetIter<'_>> {
        Ok(SnippetIter {
            root: &self.root,
            fence: &self.fence,
            files: self.documentation_files()?.into_iter(),
            pending: VecDeque::new(),
        })
    }

    /// Extract the tagged blocks from one file's content.
    pub fn extract_blocks(&self, file: &Path, content: &str) -> Vec<Snippet> {
        extract_blocks(&self.fence, file, content)
    }
}

/// Extract the tagged blocks from one file's content.
///
/// Empty blocks are dropped. A fence opened but never closed before end of
/// file matches nothing, so it yields no snippet.
fn extract_blocks(fence: &Regex, file: &Path, content: &str) -> Vec<Snippet> {
    let mut blocks = Vec::new();

    for captures in fence.captures_iter(content) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let code = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if code.is_empty() {
            continue;
        }

        // Line of the opening fence, plus one for the first code line.
        let line = content[..whole.start()].matches('\n').count() + 2;

        blocks.push(Snippet {
            file: file.to_path_buf(),
            block: blocks.len() + 1,
            line,
            code: code.to_string(),
        });
    }

    blocks
}

/// Lazy iterator over a corpus's snippets. File contents are read only as
/// the iterator reaches them.
pub struct SnippetIter<'a> {
    root: &'a Path,
    fence: &'a Regex,
    files: std::vec::IntoIter<PathBuf>,
    pending: VecDeque<Snippet>,
}

impl Iterator for SnippetIter<'_> {
    type Item = Snippet;

    fn next(&mut self) -> Option<Snippet> {
        loop {
            if let Some(snippet) = self.pending.pop_front() {
                return Some(snippet);
            }

            let path = self.files.next()?;
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("warning: skipping unreadable file '{}': {}", path.display(), e);
                    continue;
                }
            };

            let rel = path.strip_prefix(self.root).unwrap_or(&path).to_path_buf();
            self.pending = extract_blocks(self.fence, &rel, &content).into();
        }
    }
}

/// Recursively collect regular files under `dir`, sorted traversal.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        VetError::UserError(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => {
                eprintln!("warning: skipping unreadable entry in '{}': {}", dir.display(), e);
            }
        }
    }
    paths.sort();

    for path in paths {
        if path.is_dir() {
            // Subdirectory read failures are warnings, not fatal.
            if let Err(e) = collect_files(&path, out) {
                eprintln!("warning: {}", e);
            }
        } else if path.is_file() {
            out.push(path);
        }
    }

    Ok(())
}
