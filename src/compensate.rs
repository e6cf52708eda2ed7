// src/compensate.rs
//! Compensating actions for multi-step operations.
//!
//! Every step that mutates the working copy pushes its inverse before it
//! runs. When a later step fails the stack is unwound newest first. Steps
//! that fail to undo are collected and reported; there is no second level of
//! rollback.

use crate::error::{MicrobranchError, Result};
use crate::vcs::Vcs;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// One recorded inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Delete a file that the step is about to create.
    RemoveFile(PathBuf),
    /// Put back the bytes a file had before the step overwrote or deleted it.
    RestoreFile { path: PathBuf, contents: Vec<u8> },
    /// Move `current` back to `original`.
    RenameBack { current: PathBuf, original: PathBuf },
    /// Delete a directory tree the step is about to create.
    RemoveDir(PathBuf),
    /// Revert VCS bookkeeping for the given working-copy paths.
    VcsRevert(Vec<String>),
    /// Revert the whole working copy.
    VcsRevertAll,
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveFile(p) => write!(f, "remove {}", p.display()),
            Self::RestoreFile { path, .. } => write!(f, "restore {}", path.display()),
            Self::RenameBack { current, original } => {
                write!(f, "rename {} back to {}", current.display(), original.display())
            }
            Self::RemoveDir(p) => write!(f, "remove directory {}", p.display()),
            Self::VcsRevert(paths) => write!(f, "revert {}", paths.join(", ")),
            Self::VcsRevertAll => write!(f, "revert working copy"),
        }
    }
}

impl Compensation {
    fn apply(&self, vcs: &dyn Vcs) -> Result<()> {
        match self {
            Self::RemoveFile(path) => {
                if path.exists() {
                    fs::remove_file(path).map_err(MicrobranchError::io(path))?;
                }
            }
            Self::RestoreFile { path, contents } => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(MicrobranchError::io(parent))?;
                }
                fs::write(path, contents).map_err(MicrobranchError::io(path))?;
            }
            Self::RenameBack { current, original } => {
                if current.exists() {
                    fs::rename(current, original).map_err(MicrobranchError::io(current))?;
                }
            }
            Self::RemoveDir(path) => {
                if path.exists() {
                    fs::remove_dir_all(path).map_err(MicrobranchError::io(path))?;
                }
            }
            Self::VcsRevert(paths) => vcs.revert(paths)?,
            Self::VcsRevertAll => vcs.revert_all()?,
        }
        Ok(())
    }
}

/// Outcome of unwinding a stack.
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub undone: Vec<String>,
    pub failed: Vec<String>,
}

impl RollbackReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CompensationStack {
    steps: Vec<Compensation>,
}

impl CompensationStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every recorded inverse, newest first, and empties the stack.
    pub fn unwind(&mut self, vcs: &dyn Vcs) -> RollbackReport {
        let mut report = RollbackReport::default();
        while let Some(step) = self.steps.pop() {
            match step.apply(vcs) {
                Ok(()) => report.undone.push(step.to_string()),
                Err(e) => report.failed.push(format!("{step}: {e}")),
            }
        }
        report
    }

    /// Discards the recorded inverses once the operation has succeeded.
    pub fn commit(mut self) {
        self.steps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::StatusEntry;
    use anyhow::Result;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingVcs {
        reverted: RefCell<Vec<String>>,
    }

    impl Vcs for RecordingVcs {
        fn root(&self) -> crate::error::Result<PathBuf> {
            Ok(PathBuf::from("."))
        }
        fn current_branch(&self) -> crate::error::Result<String> {
            Ok("default".into())
        }
        fn branches(&self) -> crate::error::Result<Vec<String>> {
            Ok(vec!["default".into()])
        }
        fn status(&self) -> crate::error::Result<Vec<StatusEntry>> {
            Ok(Vec::new())
        }
        fn add(&self, _path: &str) -> crate::error::Result<()> {
            Ok(())
        }
        fn remove(&self, _path: &str) -> crate::error::Result<()> {
            Ok(())
        }
        fn rename(&self, _from: &str, _to: &str) -> crate::error::Result<()> {
            Ok(())
        }
        fn revert(&self, paths: &[String]) -> crate::error::Result<()> {
            self.reverted.borrow_mut().extend(paths.iter().cloned());
            Ok(())
        }
        fn revert_all(&self) -> crate::error::Result<()> {
            Err(MicrobranchError::Vcs {
                command: "hg revert --all".into(),
                detail: "abort: no repository".into(),
            })
        }
        fn update(&self, _branch: &str) -> crate::error::Result<()> {
            Ok(())
        }
        fn changeset_for(&self, _b: &str, _p: &str) -> crate::error::Result<Option<String>> {
            Ok(None)
        }
        fn commit(&self, _paths: &[String], _m: &str) -> crate::error::Result<String> {
            Ok(String::new())
        }
    }

    fn write(path: &Path, text: &str) -> Result<()> {
        fs::write(path, text)?;
        Ok(())
    }

    #[test]
    fn test_unwind_runs_newest_first() -> Result<()> {
        let dir = TempDir::new()?;
        let file = dir.path().join("a.txt");
        write(&file, "original")?;

        let mut stack = CompensationStack::new();
        stack.push(Compensation::RestoreFile {
            path: file.clone(),
            contents: b"original".to_vec(),
        });
        write(&file, "first edit")?;
        stack.push(Compensation::RemoveFile(file.clone()));
        write(&file, "second edit")?;

        let vcs = RecordingVcs::default();
        let report = stack.unwind(&vcs);

        assert!(report.is_complete());
        assert_eq!(report.undone.len(), 2);
        assert_eq!(fs::read_to_string(&file)?, "original");
        assert!(stack.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_steps_are_reported_not_retried() -> Result<()> {
        let dir = TempDir::new()?;
        let moved = dir.path().join("b.manifest.1");
        let original = dir.path().join("b.manifest");
        write(&moved, "version 2")?;

        let mut stack = CompensationStack::new();
        stack.push(Compensation::RenameBack {
            current: moved,
            original: original.clone(),
        });
        stack.push(Compensation::VcsRevertAll);
        stack.push(Compensation::VcsRevert(vec!["src/a.c".into()]));

        let vcs = RecordingVcs::default();
        let report = stack.unwind(&vcs);

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].starts_with("revert working copy"));
        assert_eq!(report.undone.len(), 2);
        assert_eq!(*vcs.reverted.borrow(), vec!["src/a.c".to_string()]);
        assert!(original.exists());
        Ok(())
    }
}
