//! Heuristic snippet remediation.
//!
//! A fixed, ordered chain of rewrite rules targeting the failure patterns
//! most common in documentation examples. Each rule is a pure function from
//! text to an optional rewrite; the chain applies them left to right, each
//! rule seeing the previous rule's output. Ordering is part of the contract.
//!
//! A rule that matches records its description even when the rewrite turns
//! out to be textually a no-op. Rules never fail; unmatched input passes
//! through unchanged. These are best-effort rewrites, not guaranteed fixes:
//! notably, loop instrumentation injects diagnostic output but does not
//! bound the loop, so an infinite loop still times out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A single remediation rule: a description recorded when it fires, and a
/// pure transform returning `Some(rewritten)` on match, `None` otherwise.
pub struct Rule {
    /// Human-readable fix description recorded in the validation record.
    pub description: &'static str,
    /// The transform. Must be idempotent: applying it to its own output
    /// yields no further change.
    pub apply: fn(&str) -> Option<String>,
}

/// The ordered remediation chain.
pub fn rules() -> &'static [Rule] {
    static RULES: [Rule; 5] = [
        Rule {
            description: "Added missing semicolon",
            apply: fix_terminator,
        },
        Rule {
            description: "Made server non-blocking",
            apply: fix_server_liveness,
        },
        Rule {
            description: "Added print statements to prevent infinite loops",
            apply: fix_loop_instrumentation,
        },
        Rule {
            description: "Fixed create() calls with missing arguments",
            apply: fix_create_arity,
        },
        Rule {
            description: "Added missing let declarations",
            apply: fix_declarations,
        },
    ];
    &RULES
}

/// Result of running the remediation chain over one snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationResult {
    /// The remediated code; equal to the input when no rule fired.
    pub code: String,
    /// Descriptions of the rules that fired, in application order.
    pub applied: Vec<String>,
}

/// Apply the full chain to a snippet's code.
///
/// Deterministic: identical input always yields identical output.
pub fn remediate(code: &str) -> RemediationResult {
    let mut current = code.to_string();
    let mut applied = Vec::new();

    for rule in rules() {
        if let Some(rewritten) = (rule.apply)(&current) {
            current = rewritten;
            applied.push(rule.description.to_string());
        }
    }

    RemediationResult {
        code: current,
        applied,
    }
}

/// Pass-through result for a snippet validated without fixes.
pub fn unremediated(code: &str) -> RemediationResult {
    RemediationResult {
        code: code.to_string(),
        applied: Vec::new(),
    }
}

/// Append a statement terminator unless the snippet already ends with one
/// or with the block-closing keyword.
fn fix_terminator(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.ends_with(';') || trimmed.ends_with("end") {
        return None;
    }
    Some(format!("{};", trimmed))
}

/// A snippet that builds a server and calls its blocking listen method
/// gets a trailing print so the process has observable output; the run
/// still relies on the executor timeout to end it.
fn fix_server_liveness(code: &str) -> Option<String> {
    if !code.contains("server.create") || !code.contains("app.listen()") {
        return None;
    }
    if code.contains("print(\"Server started\")") {
        return None;
    }
    Some(code.replace(
        "app.listen();",
        "app.listen();\nprint(\"Server started\");",
    ))
}

/// Inject a print inside each `while` body when the snippet produces no
/// output at all. Aids diagnosing a hang; does not bound the loop.
fn fix_loop_instrumentation(code: &str) -> Option<String> {
    if !code.contains("while ") || code.contains("print(") {
        return None;
    }

    let mut lines = Vec::new();
    for line in code.lines() {
        lines.push(line.to_string());
        if line.contains("while ") {
            let indent = line.len() - line.trim_start().len();
            lines.push(format!("{}print(\"Loop iteration\");", " ".repeat(indent + 4)));
        }
    }
    Some(lines.join("\n"))
}

/// Rewrite zero-argument `.create()` calls to pass a default capacity.
/// The server factory is excluded; its zero-argument form is correct.
fn fix_create_arity(code: &str) -> Option<String> {
    if !code.contains("create()") || code.contains("server.create") {
        return None;
    }

    static CREATE_CALL: OnceLock<Regex> = OnceLock::new();
    let pattern = CREATE_CALL
        .get_or_init(|| Regex::new(r"(\w+)\.create\(\)").expect("static create-call pattern"));

    Some(pattern.replace_all(code, "$1.create(10)").into_owned())
}

/// Prefix `let` to assignment lines that are neither declarations nor
/// control-flow headers.
fn fix_declarations(code: &str) -> Option<String> {
    if code.contains("let ") || (!code.contains('=') && !code.contains("if ")) {
        return None;
    }

    const HEADER_KEYWORDS: [&str; 5] = ["func ", "class ", "if ", "while ", "for "];

    let mut lines = Vec::new();
    for line in code.lines() {
        let stripped = line.trim_start();
        let is_assignment = line.contains('=')
            && !stripped.starts_with("let ")
            && !stripped.starts_with("if ")
            && !HEADER_KEYWORDS.iter().any(|k| line.contains(k));

        if is_assignment {
            lines.push(format!("let {}", line.trim()));
        } else {
            lines.push(line.to_string());
        }
    }
    Some(lines.join("\n"))
}
