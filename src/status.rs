//! Exit status codes for the CLI
//!
//! kubectl-curl follows standard Unix exit code conventions:
//! - 0: Success
//! - 1: Any error raised by kubectl-curl itself (resolution, lookup, tunnel)
//! - 130: User interrupted (Ctrl+C, standard SIGINT exit code)
//!
//! When curl itself fails, its exit code is handed back untouched so scripts
//! can keep matching on curl's documented codes (e.g. 22 for `--fail`).

use std::process::{ExitCode, Termination};

/// Exit status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Successful execution
    Success,
    /// Any error raised before or around the curl invocation
    Error,
    /// User interrupted (Ctrl+C) - standard SIGINT code
    Interrupted,
    /// curl exited non-zero with this code
    Client(u8),
}

impl ExitStatus {
    /// Numeric process exit code
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
            ExitStatus::Interrupted => 130,
            ExitStatus::Client(code) => code,
        }
    }

    /// Create an exit status from a child process exit code
    ///
    /// Codes outside the 0-255 range (or a missing code, e.g. the child was
    /// killed by a signal) collapse to `Error`.
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ExitStatus::Success,
            Some(code) => u8::try_from(code)
                .map(ExitStatus::Client)
                .unwrap_or(ExitStatus::Error),
            None => ExitStatus::Error,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
