// src/stage/state.rs
//! Staging database persistence.

use super::{area_path, db_path, ChangeKind, DB_FILE, ENTRY_FORMAT_VERSION};
use crate::error::{MicrobranchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One staged path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedEntry {
    pub format_version: u32,
    /// Snapshot id, or `None` for a reference to the live file.
    pub snapshot: Option<String>,
    pub state: ChangeKind,
}

impl StagedEntry {
    #[must_use]
    pub fn reference(state: ChangeKind) -> Self {
        Self {
            format_version: ENTRY_FORMAT_VERSION,
            snapshot: None,
            state,
        }
    }

    #[must_use]
    pub fn snapshot(id: String, state: ChangeKind) -> Self {
        Self {
            format_version: ENTRY_FORMAT_VERSION,
            snapshot: Some(id),
            state,
        }
    }

    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// A loaded staging area.
#[derive(Debug, Clone)]
pub struct StagingArea {
    pub name: String,
    dir: PathBuf,
    pub entries: BTreeMap<String, StagedEntry>,
}

impl StagingArea {
    /// Empty area; nothing is written until `save`.
    #[must_use]
    pub fn new(staging_root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: area_path(staging_root, name),
            entries: BTreeMap::new(),
        }
    }

    /// Loads an area, or `None` when it has no database.
    ///
    /// # Errors
    /// Returns `StageDb` if the database cannot be parsed.
    pub fn load(staging_root: &Path, name: &str) -> Result<Option<Self>> {
        let path = db_path(staging_root, name);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(MicrobranchError::io(&path))?;
        let entries = serde_json::from_str(&content).map_err(|e| MicrobranchError::StageDb {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(Self {
            name: name.to_string(),
            dir: area_path(staging_root, name),
            entries,
        }))
    }

    /// Loads an area or starts an empty one.
    ///
    /// # Errors
    /// Returns `StageDb` if an existing database cannot be parsed.
    pub fn open(staging_root: &Path, name: &str) -> Result<Self> {
        Ok(Self::load(staging_root, name)?.unwrap_or_else(|| Self::new(staging_root, name)))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.join(DB_FILE).is_file()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn snapshot_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// Writes the database atomically: a temp file in the area directory is
    /// persisted over `stage.db`.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be written.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(MicrobranchError::io(&self.dir))?;
        let path = self.dir.join(DB_FILE);
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            MicrobranchError::StageDb {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(MicrobranchError::io(&self.dir))?;
        tmp.write_all(json.as_bytes())
            .map_err(MicrobranchError::io(tmp.path()))?;
        tmp.as_file()
            .sync_all()
            .map_err(MicrobranchError::io(&path))?;
        tmp.persist(&path)
            .map_err(|e| MicrobranchError::io(&path)(e.error))?;
        Ok(())
    }

    /// Saves, or removes the area directory when no entries remain.
    ///
    /// # Errors
    /// Returns error if the write or removal fails.
    pub fn save_or_remove(&self) -> Result<()> {
        if self.is_empty() {
            self.remove()
        } else {
            self.save()
        }
    }

    /// Deletes the area directory with its database and snapshots.
    ///
    /// # Errors
    /// Returns error if removal fails.
    pub fn remove(&self) -> Result<()> {
        super::remove_tree(&self.dir)
    }

    /// Drops an entry and its snapshot file. Returns the removed entry.
    ///
    /// # Errors
    /// Returns error if the snapshot file exists but cannot be deleted.
    pub fn remove_entry(&mut self, path: &str) -> Result<Option<StagedEntry>> {
        let Some(entry) = self.entries.remove(path) else {
            return Ok(None);
        };
        if let Some(id) = &entry.snapshot {
            let snap = self.snapshot_path(id);
            if snap.exists() {
                fs::remove_file(&snap).map_err(MicrobranchError::io(&snap))?;
            }
        }
        Ok(Some(entry))
    }
}
