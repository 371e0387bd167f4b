//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the updatecache binary.
///
/// - 0: Success (update or clear completed)
/// - 1: General error (bad arguments, bad configuration, failed run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The run completed.
    Success = 0,
    /// General error: The run did not complete.
    GeneralError = 1,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "UC000",
            Self::GeneralError => "UC001",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "UC001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

/// Print `err` to stderr in the requested format.
pub fn report(err: &anyhow::Error, exit_code: ExitCode, json: bool) {
    if json {
        let structured = StructuredError::new(err, exit_code);
        if let Ok(json) = serde_json::to_string_pretty(&structured) {
            eprintln!("{}", json);
            return;
        }
    }
    eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
}
