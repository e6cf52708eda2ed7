// src/stage/manager.rs
//! Stage, unstage and list operations over staging areas.

use super::copy::copy_preserving_mtime;
use super::state::{StagedEntry, StagingArea};
use super::tag::{snapshot_tag, SnapshotTag};
use super::{list_areas, prune_staging_root, validate_area_name, ChangeKind};
use crate::config::TagStyle;
use crate::context::WorkingCopyContext;
use crate::error::{MicrobranchError, Result};
use crate::events::{EventKind, EventLogger};
use crate::vcs::{StatusEntry, Vcs};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Erased {
        existed: bool,
    },
    Staged {
        /// Status lines of paths newly entered.
        added: Vec<String>,
        /// Status lines of paths already staged and refreshed.
        refreshed: Vec<String>,
        /// Paths dropped because they are no longer pending.
        purged: Vec<String>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum UnstageOutcome {
    Erased { existed: bool },
    Unstaged { removed: Vec<String>, area_removed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: String,
    pub state: ChangeKind,
    /// Live status line, or `<state> <path>` for a snapshot whose source is
    /// no longer pending.
    pub line: String,
    pub tag: SnapshotTag,
}

#[derive(Debug, Clone)]
pub struct AreaListing {
    pub name: String,
    pub entries: Vec<ListedEntry>,
}

#[derive(Debug, Default)]
pub struct StagedListing {
    pub areas: Vec<AreaListing>,
    pub purged: Vec<String>,
    pub warnings: Vec<String>,
}

impl StagedListing {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Pending changes that can be staged, with their kinds.
fn stageable(vcs: &dyn Vcs) -> Result<Vec<(StatusEntry, ChangeKind)>> {
    Ok(vcs
        .status()?
        .into_iter()
        .filter_map(|e| ChangeKind::of(&e).map(|k| (e, k)))
        .collect())
}

fn new_snapshot_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn take_snapshot(
    ctx: &WorkingCopyContext,
    area: &StagingArea,
    path: &str,
    state: ChangeKind,
    id: Option<String>,
) -> Result<StagedEntry> {
    let id = id.unwrap_or_else(new_snapshot_id);
    copy_preserving_mtime(&ctx.abs(path), &area.snapshot_path(&id))?;
    Ok(StagedEntry::snapshot(id, state))
}

/// Deletes an area directory, but only one holding a database.
fn erase_area(ctx: &WorkingCopyContext, name: &str) -> Result<bool> {
    validate_area_name(name)?;
    let area = StagingArea::new(&ctx.staging_root, name);
    if !area.exists() {
        return Ok(false);
    }
    area.remove()?;
    prune_staging_root(&ctx.staging_root)?;
    EventLogger::for_context(ctx).log(EventKind::AreaErased {
        area: name.to_string(),
    });
    Ok(true)
}

/// Adds pending changes to the named area.
///
/// With `filters`, only status lines containing one of them are staged. A
/// path that is already staged is refreshed: its snapshot is retaken when a
/// snapshot is wanted or it already is one. Entries no longer pending are
/// purged.
///
/// # Errors
/// `NothingToStage` with no pending changes, `NoMatch` when filters select
/// nothing, `InvalidSnapshotTarget` when a snapshot of an added file is
/// requested. Nothing is mutated in those cases.
pub fn stage(
    ctx: &WorkingCopyContext,
    vcs: &dyn Vcs,
    area_name: &str,
    filters: &[String],
    want_snapshot: bool,
    erase: bool,
) -> Result<StageOutcome> {
    validate_area_name(area_name)?;
    if erase {
        let existed = erase_area(ctx, area_name)?;
        return Ok(StageOutcome::Erased { existed });
    }

    let live = stageable(vcs)?;
    if live.is_empty() {
        return Err(MicrobranchError::NothingToStage);
    }

    let selected: Vec<&(StatusEntry, ChangeKind)> = live
        .iter()
        .filter(|(e, _)| filters.is_empty() || e.matches_any(filters))
        .collect();
    if selected.is_empty() {
        return Err(MicrobranchError::NoMatch {
            what: "pending changes in the working copy".into(),
        });
    }

    let mut area = StagingArea::open(&ctx.staging_root, area_name)?;

    let bad_snapshot = selected.iter().find(|(e, kind)| {
        *kind == ChangeKind::Added
            && (want_snapshot
                || area
                    .entries
                    .get(e.path())
                    .is_some_and(StagedEntry::is_snapshot))
    });
    if let Some((entry, _)) = bad_snapshot {
        return Err(MicrobranchError::InvalidSnapshotTarget(entry.path().to_string()));
    }

    let mut added = Vec::new();
    let mut refreshed = Vec::new();

    for (entry, kind) in selected {
        let path = entry.path();
        let staged = match area.entries.get(path).cloned() {
            Some(prev) => {
                refreshed.push(entry.line());
                if want_snapshot || prev.is_snapshot() {
                    take_snapshot(ctx, &area, path, *kind, prev.snapshot)?
                } else {
                    StagedEntry::reference(*kind)
                }
            }
            None => {
                added.push(entry.line());
                if want_snapshot {
                    take_snapshot(ctx, &area, path, *kind, None)?
                } else {
                    StagedEntry::reference(*kind)
                }
            }
        };
        area.entries.insert(path.to_string(), staged);
    }

    let pending: HashSet<&str> = live.iter().map(|(e, _)| e.path()).collect();
    let stale: Vec<String> = area
        .entries
        .keys()
        .filter(|k| !pending.contains(k.as_str()))
        .cloned()
        .collect();
    for path in &stale {
        area.remove_entry(path)?;
    }

    area.save_or_remove()?;
    prune_staging_root(&ctx.staging_root)?;

    EventLogger::for_context(ctx).log(EventKind::Staged {
        area: area_name.to_string(),
        paths: added.iter().chain(&refreshed).cloned().collect(),
        snapshot: want_snapshot,
    });

    Ok(StageOutcome::Staged {
        added,
        refreshed,
        purged: stale,
    })
}

/// Removes entries whose path contains any filter, or the whole area with
/// `erase`.
///
/// # Errors
/// `AreaNotFound`, `NoFilters`, or `NoMatch`.
pub fn unstage(
    ctx: &WorkingCopyContext,
    area_name: &str,
    filters: &[String],
    erase: bool,
) -> Result<UnstageOutcome> {
    validate_area_name(area_name)?;
    let Some(mut area) = StagingArea::load(&ctx.staging_root, area_name)? else {
        if erase {
            return Ok(UnstageOutcome::Erased { existed: false });
        }
        return Err(MicrobranchError::AreaNotFound(area_name.to_string()));
    };

    if erase {
        let existed = erase_area(ctx, area_name)?;
        return Ok(UnstageOutcome::Erased { existed });
    }
    if filters.is_empty() {
        return Err(MicrobranchError::NoFilters);
    }

    let matched: Vec<String> = area
        .entries
        .keys()
        .filter(|k| filters.iter().any(|f| k.contains(f.as_str())))
        .cloned()
        .collect();
    if matched.is_empty() {
        return Err(MicrobranchError::NoMatch {
            what: format!("entries in the \"{area_name}\" staging area"),
        });
    }

    for path in &matched {
        area.remove_entry(path)?;
    }
    let area_removed = area.is_empty();
    area.save_or_remove()?;
    prune_staging_root(&ctx.staging_root)?;

    EventLogger::for_context(ctx).log(EventKind::Unstaged {
        area: area_name.to_string(),
        paths: matched.clone(),
    });

    Ok(UnstageOutcome::Unstaged {
        removed: matched,
        area_removed,
    })
}

/// Reconciles areas with live status and tags each entry.
///
/// References whose path is no longer pending are purged; areas left empty
/// are deleted.
///
/// # Errors
/// `AreaNotFound` for an unknown named area; `StateMismatch` when a
/// reference's kind differs from its live status.
pub fn list_staged(
    ctx: &WorkingCopyContext,
    vcs: &dyn Vcs,
    area_name: Option<&str>,
    style: TagStyle,
) -> Result<StagedListing> {
    let names = match area_name {
        Some(name) => {
            validate_area_name(name)?;
            if StagingArea::load(&ctx.staging_root, name)?.is_none() {
                return Err(MicrobranchError::AreaNotFound(name.to_string()));
            }
            vec![name.to_string()]
        }
        None => list_areas(&ctx.staging_root)?,
    };

    let status = vcs.status()?;
    let live: HashMap<&str, &StatusEntry> = status.iter().map(|e| (e.path(), e)).collect();
    let logger = EventLogger::for_context(ctx);
    let mut listing = StagedListing::default();

    for name in names {
        let Some(mut area) = StagingArea::load(&ctx.staging_root, &name)? else {
            continue;
        };
        let reference_count = area.entries.values().filter(|e| !e.is_snapshot()).count();
        let snapshot_count = area.entries.len() - reference_count;

        let mut entries = Vec::new();
        let mut orphans = Vec::new();

        for (path, staged) in &area.entries {
            let live_entry = live.get(path.as_str()).copied();
            match (&staged.snapshot, live_entry) {
                (None, Some(status_entry)) => {
                    check_state(path, staged.state, status_entry)?;
                    entries.push(ListedEntry {
                        path: path.clone(),
                        state: staged.state,
                        line: status_entry.line(),
                        tag: SnapshotTag::Reference,
                    });
                }
                (None, None) => orphans.push(path.clone()),
                (Some(id), _) => {
                    let tag = snapshot_tag(&area.snapshot_path(id), &ctx.abs(path), style)?;
                    let line = live_entry
                        .map_or_else(|| format!("{} {path}", staged.state), |e| e.line());
                    entries.push(ListedEntry {
                        path: path.clone(),
                        state: staged.state,
                        line,
                        tag,
                    });
                }
            }
        }

        for path in &orphans {
            area.remove_entry(path)?;
        }
        if !orphans.is_empty() {
            logger.log(EventKind::OrphansPurged {
                area: name.clone(),
                paths: orphans.clone(),
            });
            listing.purged.extend(orphans);
        }

        if area.is_empty() {
            if status.is_empty() && reference_count != 0 && snapshot_count == 0 {
                listing
                    .warnings
                    .push(format!("Purging orphaned staging area \"{name}\"."));
            }
            area.remove()?;
        } else {
            area.save()?;
            listing.areas.push(AreaListing { name, entries });
        }
    }

    prune_staging_root(&ctx.staging_root)?;
    Ok(listing)
}

/// Fails when a staged reference's kind no longer matches the live status.
pub(crate) fn check_state(path: &str, staged: ChangeKind, live: &StatusEntry) -> Result<()> {
    if ChangeKind::of(live) == Some(staged) {
        return Ok(());
    }
    Err(MicrobranchError::StateMismatch {
        path: path.to_string(),
        staged,
        live: live.code().to_string(),
    })
}
