// src/shelf/conflicts.rs
//! Predicting which entries a restore would have to merge.

use super::location::ShelfFiles;
use super::manifest::{ManifestEntry, ShelfManifest};
use super::Tools;
use crate::context::WorkingCopyContext;
use crate::error::{MicrobranchError, Result};
use crate::fingerprint::{file_digest, FingerprintScheme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub entry: ManifestEntry,
    pub reason: String,
}

#[derive(Debug)]
pub struct ConflictReport {
    pub name: String,
    pub version: u32,
    pub conflicts: Vec<Conflict>,
    /// Modified and renamed entries examined.
    pub checked: usize,
}

impl ConflictReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Compares each modified or renamed entry's fingerprint with the working
/// copy without touching anything. Legacy manifests are checked by
/// changeset only, since their CRC needs the archived bytes.
///
/// # Errors
/// `ShelfNotFound`, a malformed manifest, or a VCS failure.
pub fn check_conflicts(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    name: &str,
) -> Result<ConflictReport> {
    let files = ShelfFiles::new(&ctx.shelf_root, name, tools.archiver.extension());
    if !files.exists() {
        return Err(MicrobranchError::ShelfNotFound(name.to_string()));
    }
    let manifest = ShelfManifest::load(&files.manifest)?;
    let scheme = manifest.scheme();

    let mut conflicts = Vec::new();
    let mut checked = 0;

    for entry in &manifest.entries {
        let lookup = match entry {
            ManifestEntry::Modified { path, .. } => path,
            ManifestEntry::Renamed { from, .. } => from,
            _ => continue,
        };
        checked += 1;

        let reason = match scheme {
            FingerprintScheme::ContentDigest => {
                // a rename's base content sits at its source until restored
                let live = ctx.abs(lookup);
                if !live.exists() {
                    Some("missing from the working copy".to_string())
                } else if file_digest(&live)? != entry.fingerprint() {
                    Some("changed since it was shelved".to_string())
                } else {
                    None
                }
            }
            FingerprintScheme::LegacyChangesetCrc => {
                match tools.vcs.changeset_for(&ctx.branch, lookup)? {
                    None => Some("changeset unavailable".to_string()),
                    Some(cs) if cs != entry.fingerprint() => {
                        Some(format!("base changeset is now {cs}"))
                    }
                    Some(_) => None,
                }
            }
        };

        if let Some(reason) = reason {
            conflicts.push(Conflict {
                entry: entry.clone(),
                reason,
            });
        }
    }

    Ok(ConflictReport {
        name: name.to_string(),
        version: manifest.version,
        conflicts,
        checked,
    })
}
