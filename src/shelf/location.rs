// src/shelf/location.rs
//! Where a shelf's manifest and archive live, and their rotated backups.

use crate::compensate::{Compensation, CompensationStack};
use crate::error::{MicrobranchError, Result};
use std::collections::BTreeSet;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MANIFEST_EXT: &str = "manifest";

/// Prefix of the backup a branch switch leaves after consuming a shelf.
pub const CONSUMED_PREFIX: &str = "_";

/// Percent-encodes every byte outside `[A-Za-z0-9._~-]`.
#[must_use]
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Reverses `encode_name`; malformed escapes are kept literally.
#[must_use]
pub fn decode_name(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).and_then(|d| u8::try_from(d).ok())
}

/// The manifest/archive pair for one shelf name.
#[derive(Debug, Clone)]
pub struct ShelfFiles {
    pub name: String,
    pub stem: String,
    pub dir: PathBuf,
    pub manifest: PathBuf,
    pub archive: PathBuf,
    archive_ext: String,
}

impl ShelfFiles {
    #[must_use]
    pub fn new(dir: &Path, name: &str, archive_ext: &str) -> Self {
        let stem = encode_name(name);
        Self {
            name: name.to_string(),
            manifest: dir.join(format!("{stem}.{MANIFEST_EXT}")),
            archive: dir.join(format!("{stem}.{archive_ext}")),
            dir: dir.to_path_buf(),
            stem,
            archive_ext: archive_ext.to_string(),
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.manifest.is_file()
    }

    /// Moves an existing manifest and archive aside as `<file>.<hex-secs>`.
    /// Each move pushes its inverse. Returns the suffix used, if anything moved.
    ///
    /// # Errors
    /// Returns error if a rename fails.
    pub fn rotate(&self, stack: &mut CompensationStack) -> Result<Option<String>> {
        if !self.manifest.exists() && !self.archive.exists() {
            return Ok(None);
        }
        let suffix = self.free_suffix();
        for file in [&self.manifest, &self.archive] {
            if !file.exists() {
                continue;
            }
            let backup = with_suffix(file, &suffix);
            stack.push(Compensation::RenameBack {
                current: backup.clone(),
                original: file.clone(),
            });
            fs::rename(file, &backup).map_err(MicrobranchError::io(file))?;
        }
        Ok(Some(suffix))
    }

    /// Hex timestamp not yet used by a backup of this shelf.
    fn free_suffix(&self) -> String {
        let mut secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        loop {
            let suffix = format!("{secs:x}");
            let taken = [&self.manifest, &self.archive]
                .iter()
                .any(|f| with_suffix(f, &suffix).exists());
            if !taken {
                return suffix;
            }
            secs += 1;
        }
    }

    /// Deletes rotated backups beyond the newest `keep`; `keep == 0` keeps
    /// them all. Returns how many backup generations were removed.
    ///
    /// # Errors
    /// Returns error if the shelf directory cannot be read or a backup cannot
    /// be deleted.
    pub fn prune_backups(&self, keep: usize) -> Result<usize> {
        let manifest_prefix = format!("{}.{MANIFEST_EXT}.", self.stem);
        let archive_prefix = format!("{}.{}.", self.stem, self.archive_ext);

        let mut generations = BTreeSet::new();
        for entry in fs::read_dir(&self.dir).map_err(MicrobranchError::io(&self.dir))? {
            let Ok(entry) = entry else { continue };
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let suffix = file_name
                .strip_prefix(&manifest_prefix)
                .or_else(|| file_name.strip_prefix(&archive_prefix));
            if let Some(stamp) = suffix.and_then(|s| u64::from_str_radix(s, 16).ok()) {
                generations.insert(stamp);
            }
        }

        if keep == 0 || generations.len() <= keep {
            return Ok(0);
        }
        let to_remove = generations.len() - keep;
        let mut removed = 0;
        for stamp in generations.into_iter().take(to_remove) {
            let suffix = format!("{stamp:x}");
            for file in [&self.manifest, &self.archive] {
                let backup = with_suffix(file, &suffix);
                match fs::remove_file(&backup) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(MicrobranchError::io(&backup)(e)),
                }
            }
            removed += 1;
        }
        Ok(removed)
    }

    /// Renames the pair to `_<stem>.*`, replacing an older backup.
    ///
    /// # Errors
    /// Returns error if a rename fails.
    pub fn retire(&self) -> Result<()> {
        let (manifest, archive) = self.retired();
        for (file, target) in [(&self.archive, &archive), (&self.manifest, &manifest)] {
            if !file.exists() {
                continue;
            }
            if target.exists() {
                fs::remove_file(target).map_err(MicrobranchError::io(target))?;
            }
            fs::rename(file, target).map_err(MicrobranchError::io(file))?;
        }
        Ok(())
    }

    /// Paths of the `_<stem>` backup pair.
    #[must_use]
    pub fn retired(&self) -> (PathBuf, PathBuf) {
        let stem = format!("{CONSUMED_PREFIX}{}", self.stem);
        (
            self.dir.join(format!("{stem}.{MANIFEST_EXT}")),
            self.dir.join(format!("{stem}.{}", self.archive_ext)),
        )
    }

    /// Deletes the manifest and archive.
    ///
    /// # Errors
    /// Returns error if a file exists but cannot be removed.
    pub fn remove(&self) -> Result<()> {
        for file in [&self.manifest, &self.archive] {
            if file.exists() {
                fs::remove_file(file).map_err(MicrobranchError::io(file))?;
            }
        }
        Ok(())
    }
}

fn with_suffix(file: &Path, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
