// src/error.rs
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stage::ChangeKind;

/// Broad families of failure, used to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The operation was never started.
    Precondition,
    /// Persisted state disagrees with the working copy.
    Consistency,
    /// An external tool (VCS, archiver) reported failure.
    ExternalTool,
    /// A multi-step operation failed after mutating the working copy.
    Rollback,
    Other,
}

#[derive(Debug, Error)]
pub enum MicrobranchError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Not inside a Mercurial working copy")]
    NotInWorkingCopy,

    #[error("Could not determine branch")]
    NoBranch,

    #[error("Cannot {action} into pending changes; the working copy must be clean")]
    DirtyWorkingCopy { action: &'static str },

    #[error("Your specified filter(s) did not match any {what}")]
    NoMatch { what: String },

    #[error("No files have been selected for staging")]
    NothingToStage,

    #[error("No filter(s) specified for unstaging")]
    NoFilters,

    #[error("No modifications are currently staged in \"{0}\"")]
    AreaNotFound(String),

    #[error("Invalid staging area name \"{0}\"")]
    InvalidAreaName(String),

    #[error("No currently staged entries were found")]
    NothingStaged,

    #[error("Only (M)odified files can be captured by snapshot: {0}")]
    InvalidSnapshotTarget(String),

    #[error("Staged version of \"{path}\" has different state ({staged} != {live})")]
    StateMismatch {
        path: String,
        staged: ChangeKind,
        live: String,
    },

    #[error("You may only commit staged modifications from one area at a time (pending: {})", .0.join(", "))]
    MultipleAreasPending(Vec<String>),

    #[error("Active staging areas found; cannot overwrite with shelved version")]
    StagingAreaConflict,

    #[error("A valid shelf state could not be found for \"{0}\"")]
    ShelfNotFound(String),

    #[error("The specified target branch \"{0}\" cannot be validated")]
    UnknownBranch(String),

    #[error("Archiver failed: {detail}")]
    ArchiveError { detail: String },

    #[error("{command} failed: {detail}")]
    Vcs { command: String, detail: String },

    #[error("Failed to determine changeset for file \"{0}\"")]
    ChangesetUnavailable(String),

    #[error("Malformed manifest {path} (line {line}): {reason}")]
    Manifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unreadable staging database {path}: {reason}")]
    StageDb { path: PathBuf, reason: String },

    #[error("Restore aborted: {reason}{}", rollback_suffix(.rollback_failures))]
    RestoreAborted {
        reason: String,
        rollback_failures: Vec<String>,
    },

    #[error("Switch to \"{target}\" failed while {state}: {reason}")]
    SwitchFailed {
        target: String,
        state: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MicrobranchError>;

impl MicrobranchError {
    /// Builds a mapper that attaches `path` to an I/O error.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            source,
            path: path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotInWorkingCopy
            | Self::NoBranch
            | Self::DirtyWorkingCopy { .. }
            | Self::NoMatch { .. }
            | Self::NothingToStage
            | Self::NoFilters
            | Self::AreaNotFound(_)
            | Self::InvalidAreaName(_)
            | Self::NothingStaged
            | Self::InvalidSnapshotTarget(_)
            | Self::ShelfNotFound(_)
            | Self::UnknownBranch(_) => ErrorClass::Precondition,
            Self::StateMismatch { .. }
            | Self::MultipleAreasPending(_)
            | Self::StagingAreaConflict
            | Self::Manifest { .. }
            | Self::StageDb { .. } => ErrorClass::Consistency,
            Self::ArchiveError { .. } | Self::Vcs { .. } | Self::ChangesetUnavailable(_) => {
                ErrorClass::ExternalTool
            }
            Self::RestoreAborted { .. } | Self::SwitchFailed { .. } => ErrorClass::Rollback,
            Self::Io { .. } | Self::Config(_) => ErrorClass::Other,
        }
    }
}

fn rollback_suffix(failures: &[String]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    format!(
        " (rollback incomplete, manual cleanup required: {})",
        failures.join("; ")
    )
}

// Allow `?` on std::io::Error by converting to MicrobranchError::Io with unknown path.
impl From<std::io::Error> for MicrobranchError {
    fn from(source: std::io::Error) -> Self {
        MicrobranchError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}

// Gracefully convert WalkDir errors
impl From<walkdir::Error> for MicrobranchError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map_or_else(|| PathBuf::from("<unknown>"), Path::to_path_buf);
        let source = e
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed"));
        MicrobranchError::Io { source, path }
    }
}
