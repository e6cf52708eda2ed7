// src/stage/mod.rs
//! Named staging areas of pending modifications.
//!
//! Each area is a directory under `.hg/stage/` holding `stage.db` (JSON) and
//! one file per snapshot. Removing the directory removes the area.

mod commit;
mod copy;
mod manager;
mod state;
mod tag;

pub use commit::{commit_staged, CommitOutcome};
pub use copy::{copy_preserving_mtime, copy_tree, remove_tree, CopyStats};
pub use manager::{
    list_staged, stage, unstage, AreaListing, ListedEntry, StageOutcome, StagedListing,
    UnstageOutcome,
};
pub use state::{StagedEntry, StagingArea};
pub use tag::{format_elapsed, SnapshotTag};

use crate::error::{MicrobranchError, Result};
use crate::vcs::StatusEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Database file inside each area directory.
pub const DB_FILE: &str = "stage.db";

/// Area used when none is named.
pub const DEFAULT_AREA: &str = "default";

/// Current `StagedEntry` record version.
pub const ENTRY_FORMAT_VERSION: u32 = 1;

/// Pending change kinds that can be staged. Deletions cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "A")]
    Added,
}

impl ChangeKind {
    /// Stageable kind of a status entry. Renames and copies stage their
    /// destination as added.
    #[must_use]
    pub fn of(entry: &StatusEntry) -> Option<Self> {
        match entry {
            StatusEntry::Modified(_) => Some(Self::Modified),
            StatusEntry::Added(_) | StatusEntry::Renamed { .. } | StatusEntry::Copied { .. } => {
                Some(Self::Added)
            }
            StatusEntry::Removed(_) | StatusEntry::Missing(_) => None,
        }
    }

    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Rejects area names that would not name a single directory under the
/// staging root.
///
/// # Errors
/// Returns `InvalidAreaName` for empty names, `.`, `..`, or names holding a
/// path separator.
pub fn validate_area_name(area: &str) -> Result<()> {
    let mut parts = Path::new(area).components();
    let single = matches!(
        (parts.next(), parts.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if !single || area.contains(['/', '\\']) {
        return Err(MicrobranchError::InvalidAreaName(area.to_string()));
    }
    Ok(())
}

/// Directory of one area.
#[must_use]
pub fn area_path(staging_root: &Path, area: &str) -> PathBuf {
    staging_root.join(area)
}

/// Database file of one area.
#[must_use]
pub fn db_path(staging_root: &Path, area: &str) -> PathBuf {
    area_path(staging_root, area).join(DB_FILE)
}

/// Names of every area that has a database, sorted.
///
/// # Errors
/// Returns error if the staging root exists but cannot be read.
pub fn list_areas(staging_root: &Path) -> Result<Vec<String>> {
    if !staging_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(staging_root)
        .map_err(MicrobranchError::io(staging_root))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().join(DB_FILE).is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Deletes the staging root once no area is left in it.
///
/// # Errors
/// Returns error if the directory cannot be read or removed.
pub fn prune_staging_root(staging_root: &Path) -> Result<()> {
    if !staging_root.is_dir() {
        return Ok(());
    }
    let empty = fs::read_dir(staging_root)
        .map_err(MicrobranchError::io(staging_root))?
        .next()
        .is_none();
    if empty {
        fs::remove_dir(staging_root).map_err(MicrobranchError::io(staging_root))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_change_kind_of_status() {
        assert_eq!(
            ChangeKind::of(&StatusEntry::Modified("a".into())),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            ChangeKind::of(&StatusEntry::Renamed {
                from: "a".into(),
                to: "b".into()
            }),
            Some(ChangeKind::Added)
        );
        assert_eq!(ChangeKind::of(&StatusEntry::Removed("a".into())), None);
        assert_eq!(ChangeKind::Added.to_string(), "A");
    }

    #[test]
    fn test_list_areas_requires_db() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir_all(root.path().join("beta"))?;
        fs::write(db_path(root.path(), "beta"), "{}")?;
        fs::create_dir_all(root.path().join("alpha"))?;
        fs::write(db_path(root.path(), "alpha"), "{}")?;
        fs::create_dir_all(root.path().join("stray"))?;

        assert_eq!(list_areas(root.path())?, vec!["alpha", "beta"]);
        assert!(list_areas(&root.path().join("missing"))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_area_names() {
        for ok in ["default", "feature-1", "my.area", "..x"] {
            assert!(validate_area_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".", "..", "a/b", "a\\b", "/abs", "../up"] {
            assert!(
                matches!(validate_area_name(bad), Err(MicrobranchError::InvalidAreaName(_))),
                "{bad}"
            );
        }
    }
}
