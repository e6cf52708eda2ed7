// src/stage/copy.rs
//! File and directory copies that keep modification times.

use crate::error::{MicrobranchError, Result};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Statistics from a tree copy.
#[derive(Debug, Default)]
pub struct CopyStats {
    pub files_copied: usize,
    pub dirs_copied: usize,
    pub symlinks_skipped: usize,
}

/// Copies `src` to `dest` and gives the copy the source's mtime, so a later
/// mtime comparison tells whether the source changed since.
///
/// # Errors
/// Returns error if the copy or the timestamp update fails.
pub fn copy_preserving_mtime(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(MicrobranchError::io(parent))?;
    }
    fs::copy(src, dest).map_err(MicrobranchError::io(src))?;
    let meta = fs::metadata(src).map_err(MicrobranchError::io(src))?;
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(dest, mtime).map_err(MicrobranchError::io(dest))?;
    Ok(())
}

/// Copies the whole tree under `src` into `dest`, keeping mtimes.
///
/// # Errors
/// Returns error on the first entry that cannot be read or written.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    fs::create_dir_all(dest).map_err(MicrobranchError::io(dest))?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let Ok(rel_path) = entry.path().strip_prefix(src) else {
            continue;
        };
        let dest_path = dest.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path).map_err(MicrobranchError::io(&dest_path))?;
            stats.dirs_copied += 1;
        } else if entry.file_type().is_file() {
            copy_preserving_mtime(entry.path(), &dest_path)?;
            stats.files_copied += 1;
        } else {
            stats.symlinks_skipped += 1;
        }
    }

    Ok(stats)
}

/// Removes a directory and all its contents; absent is fine.
///
/// # Errors
/// Returns error if removal fails.
pub fn remove_tree(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(MicrobranchError::io(dir))?;
    }
    Ok(())
}
