//! Exit code constants for the mycovet CLI.
//!
//! - 0: Completed run (per-snippet failures do not change the exit code;
//!   pass-rate gating is left to whatever consumes the report)
//! - 1: User error (bad arguments, missing corpus root or interpreter)
//! - 2: Report output failure (artifacts could not be written)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable corpus root, missing interpreter.
pub const USER_ERROR: i32 = 1;

/// Report failure: artifacts could not be written to the output directory.
pub const REPORT_FAILURE: i32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, REPORT_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn completed_run_is_zero() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
        assert_eq!(REPORT_FAILURE, 2);
    }
}
