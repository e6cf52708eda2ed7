// src/shelf/shelve.rs
//! Saving pending changes as a shelf.

use super::location::ShelfFiles;
use super::manifest::{single_line_comment, ManifestEntry, ShelfManifest};
use super::Tools;
use crate::compensate::{Compensation, CompensationStack};
use crate::context::{WorkingCopyContext, CONTROL_DIR, STAGE_DIR};
use crate::error::{MicrobranchError, Result};
use crate::events::{EventKind, EventLogger};
use crate::fingerprint::file_digest;
use crate::stage::remove_tree;
use crate::vcs::StatusEntry;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const IDE_STATE_DIR: &str = ".vs";
const IDE_STATE_FILE: &str = ".suo";

#[derive(Debug, Clone, Default)]
pub struct ShelveOptions {
    pub name: String,
    /// Replaces the comment carried over from a previous shelf of this name.
    pub comment: Option<String>,
    pub include: Option<String>,
    pub excludes: Vec<String>,
    /// Unmanaged working-copy files to archive as well.
    pub extra_files: Vec<String>,
    /// Leave the changes in the working copy.
    pub no_revert: bool,
    /// Archive the IDE's per-solution `.suo` state.
    pub ide_state: bool,
}

impl ShelveOptions {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn is_filtered(&self) -> bool {
        self.include.is_some() || !self.excludes.is_empty()
    }

    fn passes(&self, line: &str) -> bool {
        let included = self.include.as_deref().map_or(true, |inc| line.contains(inc));
        included && !self.excludes.iter().any(|ex| line.contains(ex.as_str()))
    }
}

#[derive(Debug)]
pub struct ShelveSummary {
    pub files: ShelfFiles,
    pub manifest: ShelfManifest,
    /// Suffix the previous manifest and archive were rotated to.
    pub rotated: Option<String>,
    /// Backup generations deleted by retention.
    pub pruned: usize,
    pub reverted: bool,
}

#[derive(Debug)]
pub enum ShelveOutcome {
    NothingToShelve,
    Shelved(ShelveSummary),
}

/// Manifest entry for a pending change; `None` for changes that are not
/// shelved (missing files).
fn entry_for(status: &StatusEntry) -> Option<ManifestEntry> {
    match status {
        StatusEntry::Modified(path) => Some(ManifestEntry::Modified {
            path: path.clone(),
            fingerprint: String::new(),
        }),
        StatusEntry::Added(path) | StatusEntry::Copied { to: path, .. } => {
            Some(ManifestEntry::Added(path.clone()))
        }
        StatusEntry::Removed(path) => Some(ManifestEntry::Removed(path.clone())),
        StatusEntry::Renamed { from, to } => Some(ManifestEntry::Renamed {
            from: from.clone(),
            to: to.clone(),
            fingerprint: String::new(),
        }),
        StatusEntry::Missing(_) => None,
    }
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// `.suo` files under `.vs/`, or at the root for older layouts.
fn ide_state_files(root: &Path) -> Vec<String> {
    let vs_dir = root.join(IDE_STATE_DIR);
    if vs_dir.is_dir() {
        return WalkDir::new(&vs_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == IDE_STATE_FILE)
            .filter_map(|e| relative(root, e.path()))
            .collect();
    }

    let Ok(dir) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut files: Vec<String> = dir
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(IDE_STATE_FILE))
        .collect();
    files.sort();
    files
}

/// Paths to revert for a filtered shelve.
fn revert_targets(entries: &[ManifestEntry]) -> Vec<String> {
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            ManifestEntry::Extra(_) => {}
            ManifestEntry::Renamed { from, to, .. } => {
                paths.push(from.clone());
                paths.push(to.clone());
            }
            other => paths.push(other.path().to_string()),
        }
    }
    paths
}

fn revert_shelved(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    opts: &ShelveOptions,
    entries: &[ManifestEntry],
    staging: bool,
) -> Result<()> {
    if opts.is_filtered() {
        return tools.vcs.revert(&revert_targets(entries));
    }
    tools.vcs.revert_all()?;
    if staging {
        remove_tree(&ctx.staging_root)?;
    }
    Ok(())
}

/// Fills in digests of what is now on disk. After a revert that is the base
/// content, and rename destinations are deleted.
fn fingerprint_entries(
    ctx: &WorkingCopyContext,
    entries: &mut [ManifestEntry],
    reverted: bool,
) -> Result<()> {
    for entry in entries {
        match entry {
            ManifestEntry::Modified { path, fingerprint } => {
                *fingerprint = file_digest(&ctx.abs(path))?;
            }
            ManifestEntry::Renamed {
                from,
                to,
                fingerprint,
            } => {
                let base = ctx.abs(from);
                let source = if base.exists() { base } else { ctx.abs(to) };
                *fingerprint = file_digest(&source)?;
                let dest = ctx.abs(to);
                if reverted && dest.exists() {
                    fs::remove_file(&dest).map_err(MicrobranchError::io(&dest))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Archives pending changes under `opts.name` in the context's shelf root.
///
/// A previous shelf of the same name is rotated aside first. If archiving
/// fails the rotation is undone and the working copy is untouched. Once the
/// archive exists the changes are reverted (unless `no_revert`) and the
/// manifest is written with fingerprints of the reverted base content. A
/// failed revert still writes the manifest before the error is returned.
///
/// # Errors
/// `ArchiveError`, VCS failures, or I/O errors on the shelf root.
pub fn shelve(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    opts: &ShelveOptions,
) -> Result<ShelveOutcome> {
    let mut entries: Vec<ManifestEntry> = tools
        .vcs
        .status()?
        .iter()
        .filter(|s| opts.passes(&s.line()))
        .filter_map(entry_for)
        .collect();

    let mut extras = opts.extra_files.clone();
    if opts.ide_state {
        extras.extend(ide_state_files(&ctx.root));
    }
    extras.dedup();
    entries.extend(extras.iter().cloned().map(ManifestEntry::Extra));

    if entries.is_empty() {
        return Ok(ShelveOutcome::NothingToShelve);
    }

    fs::create_dir_all(&ctx.shelf_root).map_err(MicrobranchError::io(&ctx.shelf_root))?;
    let files = ShelfFiles::new(&ctx.shelf_root, &opts.name, tools.archiver.extension());
    let logger = EventLogger::for_context(ctx);

    let previous_comment = if files.exists() {
        ShelfManifest::load(&files.manifest).ok().map(|m| m.comment)
    } else {
        None
    };
    let comment = opts
        .comment
        .as_deref()
        .map(single_line_comment)
        .or(previous_comment)
        .unwrap_or_default();

    let mut stack = CompensationStack::new();
    let rotated = files.rotate(&mut stack)?;

    let staging = ctx.has_staging();
    let mut archive_list = Vec::new();
    if staging {
        archive_list.push(format!("{CONTROL_DIR}/{STAGE_DIR}"));
    }
    archive_list.extend(extras.iter().cloned());
    archive_list.extend(
        entries
            .iter()
            .filter(|e| !matches!(e, ManifestEntry::Extra(_)))
            .filter_map(ManifestEntry::archived_path)
            .map(str::to_string),
    );

    if !archive_list.is_empty() {
        stack.push(Compensation::RemoveFile(files.archive.clone()));
        if let Err(e) = tools.archiver.create(&files.archive, &ctx.root, &archive_list) {
            let report = stack.unwind(tools.vcs);
            logger.log(EventKind::RolledBack {
                operation: "shelve".into(),
                undone: report.undone.len(),
                failed: report.failed,
            });
            return Err(e);
        }
    }
    stack.commit();

    let reverted = !opts.no_revert;
    if reverted {
        if let Err(e) = revert_shelved(ctx, tools, opts, &entries, staging) {
            // The archive already holds the changes; keep them restorable.
            fingerprint_entries(ctx, &mut entries, false)?;
            let manifest = ShelfManifest::new(&comment, entries);
            manifest.save(&files.manifest)?;
            logger.log(EventKind::Shelved {
                name: opts.name.clone(),
                entries: manifest.entries.len(),
                reverted: false,
            });
            return Err(e);
        }
    }
    fingerprint_entries(ctx, &mut entries, reverted)?;

    let manifest = ShelfManifest::new(&comment, entries);
    manifest.save(&files.manifest)?;
    let pruned = files.prune_backups(tools.backup_retention)?;

    if let Some(suffix) = &rotated {
        logger.log(EventKind::ShelfRotated {
            name: opts.name.clone(),
            backup: suffix.clone(),
        });
    }
    logger.log(EventKind::Shelved {
        name: opts.name.clone(),
        entries: manifest.entries.len(),
        reverted,
    });

    Ok(ShelveOutcome::Shelved(ShelveSummary {
        files,
        manifest,
        rotated,
        pruned,
        reverted,
    }))
}
