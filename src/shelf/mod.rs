// src/shelf/mod.rs
//! Shelves: the whole set of pending changes saved as a manifest plus an
//! archive, restorable later on any branch.

mod conflicts;
mod listing;
pub mod location;
pub mod manifest;
mod restore;
mod shelve;

pub use conflicts::{check_conflicts, Conflict, ConflictReport};
pub use listing::{list_shelves, ShelfSummary};
pub use location::{decode_name, encode_name, ShelfFiles};
pub use manifest::{ManifestEntry, ShelfManifest, MANIFEST_VERSION};
pub use restore::{restore, EntryOutcome, RestoreOptions, RestoreReport, RestoredEntry};
pub use shelve::{shelve, ShelveOptions, ShelveOutcome, ShelveSummary};

use crate::archive::Archiver;
use crate::merge::MergeTool;
use crate::vcs::Vcs;

/// Shelf name used when none is given.
pub const DEFAULT_SHELF: &str = "shelf";

/// External collaborators a shelf operation drives.
#[derive(Clone, Copy)]
pub struct Tools<'a> {
    pub vcs: &'a dyn Vcs,
    pub archiver: &'a dyn Archiver,
    pub merge_tool: Option<&'a dyn MergeTool>,
    /// Rotated backups kept per shelf; zero keeps every one.
    pub backup_retention: usize,
}

impl<'a> Tools<'a> {
    #[must_use]
    pub fn new(vcs: &'a dyn Vcs, archiver: &'a dyn Archiver) -> Self {
        Self {
            vcs,
            archiver,
            merge_tool: None,
            backup_retention: crate::config::DEFAULT_BACKUP_RETENTION,
        }
    }

    #[must_use]
    pub fn with_merge_tool(mut self, tool: &'a dyn MergeTool) -> Self {
        self.merge_tool = Some(tool);
        self
    }

    #[must_use]
    pub fn with_backup_retention(mut self, keep: usize) -> Self {
        self.backup_retention = keep;
        self
    }
}
