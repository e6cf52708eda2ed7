// src/shelf/manifest.rs
//! The line-oriented shelf manifest.
//!
//! ```text
//! version 2
//! <comment>
//! M?src/a.c?<fingerprint>
//! V?old.c,new.c?<fingerprint>
//! A?src/b.c?
//! ```
//!
//! A manifest without a `version` line is version 0. Versions 0 and 1 store
//! changeset ids as fingerprints; later versions store content digests.

use crate::error::{MicrobranchError, Result};
use crate::fingerprint::FingerprintScheme;
use std::fmt;
use std::fs;
use std::path::Path;

/// Version written by `ShelfManifest::save`.
pub const MANIFEST_VERSION: u32 = 2;

const FIELD_SEP: char = '?';
const RENAME_SEP: char = ',';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Added(String),
    Modified { path: String, fingerprint: String },
    Removed(String),
    Renamed { from: String, to: String, fingerprint: String },
    /// Unmanaged file archived alongside the changes.
    Extra(String),
}

impl ManifestEntry {
    #[must_use]
    pub fn action(&self) -> char {
        match self {
            Self::Added(_) => 'A',
            Self::Modified { .. } => 'M',
            Self::Removed(_) => 'R',
            Self::Renamed { .. } => 'V',
            Self::Extra(_) => 'X',
        }
    }

    /// Path the entry applies to; the destination for renames.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Added(p) | Self::Removed(p) | Self::Extra(p) => p,
            Self::Modified { path, .. } => path,
            Self::Renamed { to, .. } => to,
        }
    }

    /// Path whose bytes the archive holds for this entry, if any.
    #[must_use]
    pub fn archived_path(&self) -> Option<&str> {
        match self {
            Self::Removed(_) => None,
            other => Some(other.path()),
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        match self {
            Self::Modified { fingerprint, .. } | Self::Renamed { fingerprint, .. } => fingerprint,
            _ => "",
        }
    }

    fn path_field(&self) -> String {
        match self {
            Self::Renamed { from, to, .. } => format!("{from}{RENAME_SEP}{to}"),
            other => other.path().to_string(),
        }
    }

    /// Serialized manifest line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}{FIELD_SEP}{}{FIELD_SEP}{}",
            self.action(),
            self.path_field(),
            self.fingerprint()
        )
    }

    /// Parses one `<action>?<path>?<fingerprint>` line.
    ///
    /// # Errors
    /// Returns a description of what is wrong with the line.
    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let mut fields = line.splitn(3, FIELD_SEP);
        let (Some(action), Some(path), Some(fingerprint)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(format!("expected 3 '{FIELD_SEP}'-separated fields"));
        };
        let path = normalize(path);
        if path.is_empty() {
            return Err("empty path".into());
        }
        let fingerprint = fingerprint.trim().to_string();

        match action {
            "A" => Ok(Self::Added(path)),
            "M" => Ok(Self::Modified { path, fingerprint }),
            "R" => Ok(Self::Removed(path)),
            "X" => Ok(Self::Extra(path)),
            "V" => {
                let (from, to) = path
                    .split_once(RENAME_SEP)
                    .ok_or_else(|| format!("rename without '{RENAME_SEP}': {path}"))?;
                Ok(Self::Renamed {
                    from: from.to_string(),
                    to: to.to_string(),
                    fingerprint,
                })
            }
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Status-style display, e.g. `M src/a.c` or `V old.c --> new.c`.
impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed { from, to, .. } => write!(f, "V {from} --> {to}"),
            other => write!(f, "{} {}", other.action(), other.path()),
        }
    }
}

/// Folds a comment onto the single line the format allows.
#[must_use]
pub fn single_line_comment(comment: &str) -> String {
    comment
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Manifests written on Windows may carry backslashes.
fn normalize(path: &str) -> String {
    path.trim().replace('\\', "/")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfManifest {
    pub version: u32,
    pub comment: String,
    pub entries: Vec<ManifestEntry>,
}

impl ShelfManifest {
    #[must_use]
    pub fn new(comment: &str, entries: Vec<ManifestEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            comment: single_line_comment(comment),
            entries,
        }
    }

    #[must_use]
    pub fn scheme(&self) -> FingerprintScheme {
        FingerprintScheme::for_version(self.version)
    }

    /// Parses manifest text. `source` only labels errors.
    ///
    /// # Errors
    /// Returns `Manifest` for an unreadable version or entry line.
    pub fn parse(text: &str, source: &Path) -> Result<Self> {
        let bad = |line: usize, reason: String| MicrobranchError::Manifest {
            path: source.to_path_buf(),
            line,
            reason,
        };

        let mut lines = text.lines().enumerate().peekable();
        let mut version = 0;
        let mut comment = String::new();

        if let Some(&(_, first)) = lines.peek() {
            if let Some(rest) = first.strip_prefix("version ") {
                version = rest
                    .trim()
                    .parse()
                    .map_err(|_| bad(1, format!("bad version '{}'", rest.trim())))?;
                lines.next();
                if version >= 1 {
                    if let Some((_, line)) = lines.next() {
                        comment = line.trim_end().to_string();
                    }
                }
            } else if ManifestEntry::parse_line(first).is_err() {
                comment = first.trim_end().to_string();
                lines.next();
            }
        }

        let mut entries = Vec::new();
        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let entry = ManifestEntry::parse_line(line.trim_end()).map_err(|r| bad(idx + 1, r))?;
            entries.push(entry);
        }

        Ok(Self {
            version,
            comment,
            entries,
        })
    }

    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(MicrobranchError::io(path))?;
        Self::parse(&text, path)
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "version {}\n{}\n",
            self.version,
            single_line_comment(&self.comment)
        );
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }

    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(MicrobranchError::io(path))
    }
}
