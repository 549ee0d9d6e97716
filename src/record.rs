//! The validation record: one snippet, its remediation, its outcome.

use crate::corpus::Snippet;
use crate::fixes::RemediationResult;
use crate::interpreter::Outcome;
use serde::{Deserialize, Serialize};

/// Immutable unit combining a snippet with what happened to it. Exactly one
/// per snippet per run; everything downstream (classification, aggregation,
/// reporting) consumes these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub snippet: Snippet,
    pub remediation: RemediationResult,
    pub outcome: Outcome,
}

impl ValidationRecord {
    pub fn is_failure(&self) -> bool {
        !self.outcome.success
    }
}
