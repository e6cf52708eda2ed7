// src/exit.rs
//! Process exit codes for `microbranch`.
//!
//! Provides a stable contract for scripts and automation.

use crate::error::{ErrorClass, MicrobranchError};
use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MicrobranchExit {
    /// Operation completed successfully.
    Success = 0,
    /// Generic error (I/O, config).
    Error = 1,
    /// Operation not started (dirty working copy, unmatched filter, unknown shelf).
    Precondition = 2,
    /// Persisted state disagrees with the working copy.
    Consistency = 3,
    /// VCS or archiver reported failure.
    ExternalTool = 4,
    /// Operation failed after mutating and was rolled back.
    RolledBack = 5,
    /// Restore finished but some entries were skipped.
    Skipped = 6,
}

impl MicrobranchExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps an application error to an exit code, looking through `anyhow`
    /// context for a library error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        err.downcast_ref::<MicrobranchError>()
            .map_or(Self::Error, |e| e.class().into())
    }
}

impl From<ErrorClass> for MicrobranchExit {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Precondition => Self::Precondition,
            ErrorClass::Consistency => Self::Consistency,
            ErrorClass::ExternalTool => Self::ExternalTool,
            ErrorClass::Rollback => Self::RolledBack,
            ErrorClass::Other => Self::Error,
        }
    }
}

impl Termination for MicrobranchExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}
