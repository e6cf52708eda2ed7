use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rotated shelf backups kept per shelf when unset. Zero keeps every one.
pub const DEFAULT_BACKUP_RETENTION: usize = 0;

/// How staged snapshot entries are tagged in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagStyle {
    /// Time elapsed between the snapshot and the live file, e.g. `1h5m`.
    #[default]
    Elapsed,
    /// The snapshot's own timestamp.
    Timestamp,
}

/// Contents of `microbranch.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicrobranchToml {
    #[serde(default = "default_archiver")]
    pub archiver: String,
    #[serde(default)]
    pub merge_tool: Option<String>,
    #[serde(default)]
    pub snapshot_as_timestamp: bool,
    #[serde(default)]
    pub shelf_root: Option<PathBuf>,
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for MicrobranchToml {
    fn default() -> Self {
        Self {
            archiver: default_archiver(),
            merge_tool: None,
            snapshot_as_timestamp: false,
            shelf_root: None,
            backup_retention: default_backup_retention(),
        }
    }
}

fn default_archiver() -> String { "7z".to_string() }
const fn default_backup_retention() -> usize { DEFAULT_BACKUP_RETENTION }

/// Effective settings after the file and the environment are merged.
#[derive(Debug, Clone)]
pub struct Config {
    pub archiver: String,
    pub merge_tool: Option<String>,
    pub tag_style: TagStyle,
    pub shelf_root: Option<PathBuf>,
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(MicrobranchToml::default())
    }
}

impl Config {
    #[must_use]
    pub fn from_toml(file: MicrobranchToml) -> Self {
        Self {
            archiver: file.archiver,
            merge_tool: file.merge_tool.filter(|t| !t.trim().is_empty()),
            tag_style: if file.snapshot_as_timestamp {
                TagStyle::Timestamp
            } else {
                TagStyle::Elapsed
            },
            shelf_root: file.shelf_root,
            backup_retention: file.backup_retention,
        }
    }
}
