// src/stage/commit.rs
//! Committing the contents of one staging area.

use super::copy::copy_preserving_mtime;
use super::manager::{check_state, list_staged};
use super::state::StagingArea;
use super::tag::mtime_seconds;
use super::{prune_staging_root, validate_area_name, ChangeKind};
use crate::compensate::{Compensation, CompensationStack};
use crate::config::TagStyle;
use crate::context::WorkingCopyContext;
use crate::error::{MicrobranchError, Result};
use crate::events::{EventKind, EventLogger};
use crate::vcs::{StatusEntry, Vcs};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CommitOutcome {
    pub area: String,
    pub committed: Vec<String>,
    /// Snapshot entries whose frozen bytes were committed instead of the
    /// live file.
    pub swapped: Vec<String>,
    /// Staged paths with no file on disk.
    pub skipped: Vec<String>,
    pub output: String,
}

struct Swap {
    path: String,
    live: PathBuf,
    backup: PathBuf,
    state: ChangeKind,
}

/// Commits exactly the paths staged in one area, then deletes the area.
///
/// A snapshot whose mtime differs from the live file is committed in place
/// of it: the live file is backed up beside the snapshot as `<id>.bak`, the
/// snapshot is copied over it, and the backup is put back after the commit.
///
/// # Errors
/// `MultipleAreasPending`, `AreaNotFound`, `NothingStaged`, `StateMismatch`,
/// or the VCS commit failure after the swaps were undone.
pub fn commit_staged(
    ctx: &WorkingCopyContext,
    vcs: &dyn Vcs,
    area_name: Option<&str>,
    message: &str,
) -> Result<CommitOutcome> {
    if let Some(name) = area_name {
        validate_area_name(name)?;
    }
    let listing = list_staged(ctx, vcs, None, TagStyle::Elapsed)?;
    let pending: Vec<String> = listing.areas.iter().map(|a| a.name.clone()).collect();

    if pending.len() > 1 {
        return Err(MicrobranchError::MultipleAreasPending(pending));
    }
    if let Some(name) = area_name {
        if !pending.iter().any(|p| p == name) {
            return Err(MicrobranchError::AreaNotFound(name.to_string()));
        }
    }
    let Some(name) = pending.into_iter().next() else {
        return Err(MicrobranchError::NothingStaged);
    };
    let Some(area) = StagingArea::load(&ctx.staging_root, &name)? else {
        return Err(MicrobranchError::NothingStaged);
    };

    let status = vcs.status()?;
    let live: HashMap<&str, &StatusEntry> = status.iter().map(|e| (e.path(), e)).collect();

    let mut stack = CompensationStack::new();
    let mut swaps = Vec::new();
    let mut committed = Vec::new();
    let mut skipped = Vec::new();

    for (path, staged) in &area.entries {
        let full = ctx.abs(path);
        if !full.exists() {
            skipped.push(path.clone());
            continue;
        }
        match &staged.snapshot {
            None => {
                if let Some(entry) = live.get(path.as_str()) {
                    check_state(path, staged.state, entry)?;
                }
            }
            Some(id) => {
                let snapshot = area.snapshot_path(id);
                if mtime_seconds(&snapshot)? != mtime_seconds(&full)? {
                    let prepared = swap_in(&mut stack, &area, path, id, staged.state, &full);
                    match prepared {
                        Ok(swap) => swaps.push(swap),
                        Err(e) => {
                            stack.unwind(vcs);
                            return Err(e);
                        }
                    }
                }
            }
        }
        committed.push(path.clone());
    }

    let output = match vcs.commit(&committed, message) {
        Ok(out) => out,
        Err(e) => {
            let report = stack.unwind(vcs);
            EventLogger::for_context(ctx).log(EventKind::RolledBack {
                operation: "commit".into(),
                undone: report.undone.len(),
                failed: report.failed,
            });
            return Err(e);
        }
    };
    stack.commit();

    for swap in &swaps {
        copy_preserving_mtime(&swap.backup, &swap.live)?;
        if swap.state == ChangeKind::Added {
            vcs.add(&swap.path)?;
        }
    }

    area.remove()?;
    prune_staging_root(&ctx.staging_root)?;

    EventLogger::for_context(ctx).log(EventKind::StagedCommitted {
        area: name.clone(),
        files: committed.len(),
    });

    Ok(CommitOutcome {
        area: name,
        committed,
        swapped: swaps.into_iter().map(|s| s.path).collect(),
        skipped,
        output,
    })
}

fn swap_in(
    stack: &mut CompensationStack,
    area: &StagingArea,
    path: &str,
    id: &str,
    state: ChangeKind,
    live: &std::path::Path,
) -> Result<Swap> {
    let backup = area.snapshot_path(&format!("{id}.bak"));
    let original = fs::read(live).map_err(MicrobranchError::io(live))?;
    stack.push(Compensation::RestoreFile {
        path: live.to_path_buf(),
        contents: original,
    });
    copy_preserving_mtime(live, &backup)?;
    copy_preserving_mtime(&area.snapshot_path(id), live)?;
    Ok(Swap {
        path: path.to_string(),
        live: live.to_path_buf(),
        backup,
        state,
    })
}
