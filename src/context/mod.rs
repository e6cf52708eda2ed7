// src/context/mod.rs
//! The working copy an operation runs against.
//!
//! Every component receives a `WorkingCopyContext` explicitly; nothing reads
//! or changes the process working directory.

use crate::config::Config;
use crate::error::{MicrobranchError, Result};
use crate::vcs::Vcs;
use std::path::{Path, PathBuf};

/// VCS control directory under the working-copy root.
pub const CONTROL_DIR: &str = ".hg";

/// Staging areas live here, under the control directory.
pub const STAGE_DIR: &str = "stage";

/// Well-known shared shelf location, used when present.
pub const SHARED_SHELF_ROOT: &str = "/microbranches";

/// Subdirectory of the shelf root holding branch-switch shelves.
pub const SWITCH_DIR: &str = "switch";

#[derive(Debug, Clone)]
pub struct WorkingCopyContext {
    pub root: PathBuf,
    pub branch: String,
    pub control_dir: PathBuf,
    pub staging_root: PathBuf,
    pub shelf_root: PathBuf,
    /// Parent of the scratch directories restores extract into.
    pub scratch_root: PathBuf,
    /// Set when the configured shelf root was not used.
    pub shelf_root_fallback: bool,
}

impl WorkingCopyContext {
    /// Context rooted at `root` with shelves kept in the control directory.
    #[must_use]
    pub fn new(root: &Path, branch: &str) -> Self {
        let control_dir = root.join(CONTROL_DIR);
        Self {
            root: root.to_path_buf(),
            branch: branch.to_string(),
            staging_root: control_dir.join(STAGE_DIR),
            shelf_root: control_dir.clone(),
            scratch_root: std::env::temp_dir(),
            control_dir,
            shelf_root_fallback: false,
        }
    }

    #[must_use]
    pub fn with_shelf_root(mut self, shelf_root: &Path) -> Self {
        self.shelf_root = shelf_root.to_path_buf();
        self
    }

    #[must_use]
    pub fn with_scratch_root(mut self, scratch_root: &Path) -> Self {
        self.scratch_root = scratch_root.to_path_buf();
        self
    }

    /// Same working copy, viewed as being on `branch`.
    #[must_use]
    pub fn on_branch(&self, branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            ..self.clone()
        }
    }

    /// Builds the context from the VCS client and settings.
    ///
    /// # Errors
    /// Returns `NotInWorkingCopy` when no root can be resolved and `NoBranch`
    /// when the branch name is empty.
    pub fn discover(vcs: &dyn Vcs, config: &Config) -> Result<Self> {
        let root = vcs.root().map_err(|_| MicrobranchError::NotInWorkingCopy)?;
        if !root.join(CONTROL_DIR).is_dir() {
            return Err(MicrobranchError::NotInWorkingCopy);
        }
        let branch = vcs.current_branch().map_err(|_| MicrobranchError::NoBranch)?;
        if branch.is_empty() {
            return Err(MicrobranchError::NoBranch);
        }

        let mut ctx = Self::new(&root, &branch);
        let (shelf_root, fallback) =
            resolve_shelf_root(config.shelf_root.as_deref(), &ctx.control_dir);
        ctx.shelf_root = shelf_root;
        ctx.shelf_root_fallback = fallback;
        Ok(ctx)
    }

    /// Absolute path of a working-copy-relative path.
    #[must_use]
    pub fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    #[must_use]
    pub fn switch_shelf_root(&self) -> PathBuf {
        self.shelf_root.join(SWITCH_DIR)
    }

    /// True when any staging area exists.
    #[must_use]
    pub fn has_staging(&self) -> bool {
        self.staging_root.is_dir()
    }
}

/// Picks where shelves are kept: the configured root if it exists, then the
/// shared root, then the control directory, then the system temp dir. The
/// flag is set whenever the configured root was not the one used.
#[must_use]
pub fn resolve_shelf_root(configured: Option<&Path>, control_dir: &Path) -> (PathBuf, bool) {
    if let Some(root) = configured.filter(|p| p.is_dir()) {
        return (root.to_path_buf(), false);
    }
    [PathBuf::from(SHARED_SHELF_ROOT), control_dir.to_path_buf()]
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .map_or_else(|| (std::env::temp_dir(), true), |root| (root, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let ctx = WorkingCopyContext::new(Path::new("/work/repo"), "default");
        assert_eq!(ctx.staging_root, Path::new("/work/repo/.hg/stage"));
        assert_eq!(ctx.shelf_root, Path::new("/work/repo/.hg"));
        assert_eq!(ctx.switch_shelf_root(), Path::new("/work/repo/.hg/switch"));
        assert_eq!(ctx.abs("src/a.c"), Path::new("/work/repo/src/a.c"));
        assert_eq!(ctx.on_branch("feature-2").branch, "feature-2");
    }

    #[test]
    fn test_configured_root_wins() -> Result<()> {
        let shelves = TempDir::new()?;
        let control = TempDir::new()?;
        let (root, fallback) = resolve_shelf_root(Some(shelves.path()), control.path());
        assert_eq!(root, shelves.path());
        assert!(!fallback);
        Ok(())
    }

    #[test]
    fn test_missing_configured_root_falls_back() -> Result<()> {
        let control = TempDir::new()?;
        let missing = control.path().join("nope");
        let (root, fallback) = resolve_shelf_root(Some(&missing), control.path());
        assert!(fallback);
        assert_ne!(root, missing);
        Ok(())
    }
}
