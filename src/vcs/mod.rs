// src/vcs/mod.rs
//! The version-control client, consumed as an external collaborator.

mod hg;
pub mod status;

pub use hg::HgClient;
pub use status::{parse_status_output, StatusEntry};

use crate::error::Result;
use std::path::PathBuf;

/// Primitives the staging and shelving engine needs from the VCS.
///
/// Paths are relative to the working-copy root. Every call blocks until the
/// underlying command finishes; failures carry the tool's diagnostic text.
pub trait Vcs {
    /// Absolute path of the working-copy root.
    fn root(&self) -> Result<PathBuf>;

    /// Name of the branch the working copy is on.
    fn current_branch(&self) -> Result<String>;

    /// Every known branch name.
    fn branches(&self) -> Result<Vec<String>>;

    /// Pending changes, with renames and copies resolved.
    fn status(&self) -> Result<Vec<StatusEntry>>;

    fn add(&self, path: &str) -> Result<()>;

    fn remove(&self, path: &str) -> Result<()>;

    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Reverts the named paths to their last committed state.
    fn revert(&self, paths: &[String]) -> Result<()>;

    /// Reverts the whole working copy.
    fn revert_all(&self) -> Result<()>;

    /// Updates the working copy to another branch.
    fn update(&self, branch: &str) -> Result<()>;

    /// Changeset id of the last commit touching `path`, preferring commits on
    /// `branch`. `None` when the file has no history.
    fn changeset_for(&self, branch: &str, path: &str) -> Result<Option<String>>;

    /// Commits exactly `paths`; returns the tool's output.
    fn commit(&self, paths: &[String], message: &str) -> Result<String>;

    /// True when there is anything pending.
    fn is_dirty(&self) -> Result<bool> {
        Ok(!self.status()?.is_empty())
    }
}
