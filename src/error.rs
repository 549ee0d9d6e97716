//! Error types for the mycovet CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Per-snippet execution failures are never errors at this level; they become
//! failed records that the report enumerates. Only infrastructure problems
//! (bad arguments, unreadable corpus, unwritable output) surface here.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for mycovet operations.
#[derive(Error, Debug)]
pub enum VetError {
    /// User provided invalid arguments or the environment is not usable
    /// (missing corpus root, missing interpreter, bad config).
    #[error("{0}")]
    UserError(String),

    /// Report artifacts could not be written.
    #[error("Report generation failed: {0}")]
    ReportError(String),
}

impl VetError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            VetError::UserError(_) => exit_codes::USER_ERROR,
            VetError::ReportError(_) => exit_codes::REPORT_FAILURE,
        }
    }
}

/// Result type alias for mycovet operations.
pub type Result<T> = std::result::Result<T, VetError>;
