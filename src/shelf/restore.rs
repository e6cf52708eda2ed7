// src/shelf/restore.rs
//! Re-applying a shelf to a clean working copy.

use super::location::ShelfFiles;
use super::manifest::{ManifestEntry, ShelfManifest};
use super::Tools;
use crate::compensate::{Compensation, CompensationStack};
use crate::context::{WorkingCopyContext, CONTROL_DIR, STAGE_DIR};
use crate::error::{MicrobranchError, Result};
use crate::events::{EventKind, EventLogger};
use crate::fingerprint::{file_crc32, file_digest, FingerprintScheme};
use crate::stage::{copy_tree, list_areas, remove_tree};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub name: String,
    /// Copy shelved bytes over live files even when they changed since.
    pub overwrite: bool,
    /// Delete the manifest and archive after a successful restore.
    pub erase_after: bool,
}

impl RestoreOptions {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// What happened to one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Shelved bytes or bookkeeping were applied.
    Restored,
    /// The file was already present and only re-added.
    Registered,
    /// The merge tool produced a new version that was applied.
    Merged,
    /// Neither the live file nor the archive has it.
    SkippedMissing,
    /// The live file changed and no merge tool is configured.
    SkippedNoMergeTool,
    /// The merge tool ran but left the shelved copy untouched.
    SkippedMergeUnchanged,
}

impl EntryOutcome {
    #[must_use]
    pub fn is_skipped(self) -> bool {
        matches!(
            self,
            Self::SkippedMissing | Self::SkippedNoMergeTool | Self::SkippedMergeUnchanged
        )
    }
}

#[derive(Debug, Clone)]
pub struct RestoredEntry {
    pub entry: ManifestEntry,
    pub outcome: EntryOutcome,
}

#[derive(Debug)]
pub struct RestoreReport {
    pub name: String,
    pub comment: String,
    pub version: u32,
    pub entries: Vec<RestoredEntry>,
    /// A shelved staging root was put back.
    pub staging_restored: bool,
    pub erased: bool,
    /// Set when the scratch directory could not be removed afterwards.
    pub scratch_warning: Option<String>,
}

impl RestoreReport {
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }
}

/// Restores the named shelf into the working copy.
///
/// Preconditions are checked before anything changes: the manifest exists,
/// the working copy is clean, the archive exists when entries need it, and
/// no live staging area would be replaced by a shelved one. Every mutation
/// after that pushes its inverse; a failure unwinds them all.
///
/// # Errors
/// `ShelfNotFound`, `DirtyWorkingCopy`, `StagingAreaConflict`, `ArchiveError`
/// from extraction, or `RestoreAborted` once mutation has started.
pub fn restore(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    opts: &RestoreOptions,
) -> Result<RestoreReport> {
    let files = ShelfFiles::new(&ctx.shelf_root, &opts.name, tools.archiver.extension());
    if !files.exists() {
        return Err(MicrobranchError::ShelfNotFound(opts.name.clone()));
    }
    if tools.vcs.is_dirty()? {
        return Err(MicrobranchError::DirtyWorkingCopy { action: "restore" });
    }
    let manifest = ShelfManifest::load(&files.manifest)?;
    let needs_archive = manifest
        .entries
        .iter()
        .any(|e| e.archived_path().is_some());
    if needs_archive && !files.archive.is_file() {
        return Err(MicrobranchError::ShelfNotFound(opts.name.clone()));
    }

    let scratch = ctx.scratch_root.join(format!("__{}__", files.stem));
    remove_tree(&scratch)?;
    fs::create_dir_all(&scratch).map_err(MicrobranchError::io(&scratch))?;

    let applied = extract_and_apply(ctx, tools, opts, &files, &manifest, &scratch);
    let scratch_warning = remove_tree(&scratch)
        .err()
        .map(|e| format!("could not remove {}: {e}", scratch.display()));
    let (entries, staging_restored) = applied?;

    let erased = opts.erase_after;
    if erased {
        files.remove()?;
    }

    let skipped = entries.iter().filter(|e| e.outcome.is_skipped()).count();
    EventLogger::for_context(ctx).log(EventKind::Restored {
        name: opts.name.clone(),
        restored: entries.len() - skipped,
        skipped,
    });

    Ok(RestoreReport {
        name: opts.name.clone(),
        comment: manifest.comment,
        version: manifest.version,
        entries,
        staging_restored,
        erased,
        scratch_warning,
    })
}

fn extract_and_apply(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    opts: &RestoreOptions,
    files: &ShelfFiles,
    manifest: &ShelfManifest,
    scratch: &Path,
) -> Result<(Vec<RestoredEntry>, bool)> {
    if files.archive.is_file() {
        tools.archiver.extract_all(&files.archive, scratch)?;
    }

    let shelved_stage = scratch.join(CONTROL_DIR).join(STAGE_DIR);
    let has_stage = shelved_stage.is_dir();
    if has_stage && !list_areas(&ctx.staging_root)?.is_empty() {
        return Err(MicrobranchError::StagingAreaConflict);
    }

    let mut stack = CompensationStack::new();
    stack.push(Compensation::VcsRevertAll);

    let mut applier = Applier {
        ctx,
        tools,
        archive: &files.archive,
        scratch,
        scheme: manifest.scheme(),
        overwrite: opts.overwrite,
        stack: &mut stack,
    };

    let mut results = Vec::with_capacity(manifest.entries.len());
    let mut failure = None;
    for entry in &manifest.entries {
        match applier.apply(entry) {
            Ok(outcome) => results.push(RestoredEntry {
                entry: entry.clone(),
                outcome,
            }),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if failure.is_none() && has_stage {
        failure = put_back_staging(ctx, &shelved_stage, &mut stack).err();
    }

    if let Some(e) = failure {
        let report = stack.unwind(tools.vcs);
        EventLogger::for_context(ctx).log(EventKind::RolledBack {
            operation: "restore".into(),
            undone: report.undone.len(),
            failed: report.failed.clone(),
        });
        return Err(MicrobranchError::RestoreAborted {
            reason: e.to_string(),
            rollback_failures: report.failed,
        });
    }

    stack.commit();
    Ok((results, has_stage))
}

fn put_back_staging(
    ctx: &WorkingCopyContext,
    shelved_stage: &Path,
    stack: &mut CompensationStack,
) -> Result<()> {
    remove_tree(&ctx.staging_root)?;
    stack.push(Compensation::RemoveDir(ctx.staging_root.clone()));
    copy_tree(shelved_stage, &ctx.staging_root)?;
    Ok(())
}

struct Applier<'a, 't> {
    ctx: &'a WorkingCopyContext,
    tools: &'a Tools<'t>,
    archive: &'a Path,
    scratch: &'a Path,
    scheme: FingerprintScheme,
    overwrite: bool,
    stack: &'a mut CompensationStack,
}

impl Applier<'_, '_> {
    fn apply(&mut self, entry: &ManifestEntry) -> Result<EntryOutcome> {
        match entry {
            ManifestEntry::Added(path) => self.added(path),
            ManifestEntry::Modified { path, fingerprint } => self.settle(path, path, fingerprint),
            ManifestEntry::Removed(path) => self.removed(path),
            ManifestEntry::Renamed {
                from,
                to,
                fingerprint,
            } => {
                let source = self.ctx.abs(from);
                if source.exists() {
                    self.stack.push(Compensation::RenameBack {
                        current: self.ctx.abs(to),
                        original: source,
                    });
                    self.stack
                        .push(Compensation::VcsRevert(vec![from.clone(), to.clone()]));
                    self.tools.vcs.rename(from, to)?;
                }
                self.settle(to, from, fingerprint)
            }
            ManifestEntry::Extra(path) => self.extra(path),
        }
    }

    fn added(&mut self, path: &str) -> Result<EntryOutcome> {
        let live = self.ctx.abs(path);
        let outcome = if live.exists() {
            EntryOutcome::Registered
        } else {
            let archived = self.scratch.join(path);
            if !archived.exists() {
                return Ok(EntryOutcome::SkippedMissing);
            }
            self.create(&live, &archived)?;
            EntryOutcome::Restored
        };
        self.stack.push(Compensation::VcsRevert(vec![path.to_string()]));
        self.tools.vcs.add(path)?;
        Ok(outcome)
    }

    fn removed(&mut self, path: &str) -> Result<EntryOutcome> {
        let live = self.ctx.abs(path);
        if live.exists() {
            self.stack.push(Compensation::RestoreFile {
                contents: fs::read(&live).map_err(MicrobranchError::io(&live))?,
                path: live,
            });
            self.stack.push(Compensation::VcsRevert(vec![path.to_string()]));
            self.tools.vcs.remove(path)?;
        }
        Ok(EntryOutcome::Restored)
    }

    fn extra(&mut self, path: &str) -> Result<EntryOutcome> {
        let live = self.ctx.abs(path);
        if live.exists() {
            self.stack.push(Compensation::RestoreFile {
                contents: fs::read(&live).map_err(MicrobranchError::io(&live))?,
                path: live.clone(),
            });
            fs::remove_file(&live).map_err(MicrobranchError::io(&live))?;
        }
        self.stack.push(Compensation::RemoveFile(live));
        self.tools
            .archiver
            .extract_one(self.archive, &self.ctx.root, path)?;
        Ok(EntryOutcome::Restored)
    }

    /// Brings the shelved bytes of `path` into the working copy: directly
    /// when the live file is still the base it was shelved against (or with
    /// `overwrite`), through the merge tool otherwise. `lookup` is the path
    /// whose history identifies the base in legacy manifests.
    fn settle(&mut self, path: &str, lookup: &str, fingerprint: &str) -> Result<EntryOutcome> {
        let live = self.ctx.abs(path);
        let archived = self.scratch.join(path);
        if !archived.is_file() {
            return Err(MicrobranchError::ArchiveError {
                detail: format!("\"{path}\" is missing from the shelf archive"),
            });
        }
        if !live.exists() {
            self.create(&live, &archived)?;
            return Ok(EntryOutcome::Restored);
        }

        if self.overwrite || self.unchanged(&live, &archived, lookup, fingerprint)? {
            self.replace(&live, &archived)?;
            return Ok(EntryOutcome::Restored);
        }

        let Some(tool) = self.tools.merge_tool else {
            return Ok(EntryOutcome::SkippedNoMergeTool);
        };
        let before = file_digest(&archived)?;
        tool.merge(&archived, &live)?;
        if file_digest(&archived)? == before {
            return Ok(EntryOutcome::SkippedMergeUnchanged);
        }
        self.replace(&live, &archived)?;
        Ok(EntryOutcome::Merged)
    }

    fn unchanged(
        &self,
        live: &Path,
        archived: &Path,
        lookup: &str,
        fingerprint: &str,
    ) -> Result<bool> {
        match self.scheme {
            FingerprintScheme::ContentDigest => Ok(file_digest(live)? == fingerprint),
            FingerprintScheme::LegacyChangesetCrc => {
                let changeset = self
                    .tools
                    .vcs
                    .changeset_for(&self.ctx.branch, lookup)?
                    .ok_or_else(|| MicrobranchError::ChangesetUnavailable(lookup.to_string()))?;
                Ok(changeset == fingerprint && file_crc32(archived)? == file_crc32(live)?)
            }
        }
    }

    /// Copies a file that does not exist yet into place.
    fn create(&mut self, live: &Path, archived: &Path) -> Result<()> {
        if let Some(parent) = live.parent() {
            fs::create_dir_all(parent).map_err(MicrobranchError::io(parent))?;
        }
        self.stack.push(Compensation::RemoveFile(live.to_path_buf()));
        fs::copy(archived, live).map_err(MicrobranchError::io(archived))?;
        Ok(())
    }

    /// Overwrites a live file, keeping its old bytes for rollback.
    fn replace(&mut self, live: &Path, archived: &Path) -> Result<()> {
        self.stack.push(Compensation::RestoreFile {
            path: live.to_path_buf(),
            contents: fs::read(live).map_err(MicrobranchError::io(live))?,
        });
        fs::copy(archived, live).map_err(MicrobranchError::io(archived))?;
        Ok(())
    }
}
