// src/vcs/status.rs
//! Parsing of `hg status -q -C` output.
//!
//! With `-C`, every added file that was copied from somewhere is followed by
//! an indented line naming its source. When that source is also reported as
//! removed, the pair is a rename; otherwise it is a copy.

use std::collections::HashSet;
use std::fmt;

/// One pending change in the working copy, with renames and copies resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntry {
    Modified(String),
    Added(String),
    Removed(String),
    Renamed { from: String, to: String },
    Copied { from: String, to: String },
    /// Tracked but deleted without telling the VCS.
    Missing(String),
}

impl StatusEntry {
    /// Status letter as shown to the user. Renames use `V`.
    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::Modified(_) => 'M',
            Self::Added(_) => 'A',
            Self::Removed(_) => 'R',
            Self::Renamed { .. } => 'V',
            Self::Copied { .. } => 'C',
            Self::Missing(_) => '!',
        }
    }

    /// The path that holds the pending content (the destination for
    /// renames and copies).
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Modified(p) | Self::Added(p) | Self::Removed(p) | Self::Missing(p) => p,
            Self::Renamed { to, .. } | Self::Copied { to, .. } => to,
        }
    }

    /// Display line used for substring filtering, e.g. `V old.c --> new.c`.
    #[must_use]
    pub fn line(&self) -> String {
        self.to_string()
    }

    /// True when the display line contains any of `filters`.
    #[must_use]
    pub fn matches_any(&self, filters: &[String]) -> bool {
        let line = self.line();
        filters.iter().any(|f| line.contains(f.as_str()))
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed { from, to } => write!(f, "V {from} --> {to}"),
            Self::Copied { from, to } => write!(f, "C {from} ==> {to}"),
            other => write!(f, "{} {}", other.code(), other.path()),
        }
    }
}

/// Parses raw status output into resolved entries ordered
/// modified, added, renamed, removed, copied, missing.
#[must_use]
pub fn parse_status_output(output: &str) -> Vec<StatusEntry> {
    let mut modified = Vec::new();
    let mut added: Vec<(String, Option<String>)> = Vec::new();
    let mut removed = Vec::new();
    let mut missing = Vec::new();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.len() < 3 || !line.is_char_boundary(2) {
            continue;
        }
        let (code, rest) = line.split_at(2);
        let path = rest.to_string();
        match code.chars().next() {
            Some('M') => modified.push(path),
            Some('A') => added.push((path, None)),
            Some('R') => removed.push(path),
            Some('!') => missing.push(path),
            Some(' ') => {
                if let Some((_, source)) = added.last_mut() {
                    if source.is_none() {
                        *source = Some(path);
                    }
                }
            }
            _ => {}
        }
    }

    let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
    let mut rename_sources = HashSet::new();
    let mut plain_added = Vec::new();
    let mut renamed = Vec::new();
    let mut copied = Vec::new();

    for (to, source) in &added {
        match source {
            Some(from) if removed_set.contains(from.as_str()) => {
                rename_sources.insert(from.clone());
                renamed.push(StatusEntry::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            Some(from) => copied.push(StatusEntry::Copied {
                from: from.clone(),
                to: to.clone(),
            }),
            None => plain_added.push(StatusEntry::Added(to.clone())),
        }
    }

    let mut entries: Vec<StatusEntry> = modified.into_iter().map(StatusEntry::Modified).collect();
    entries.extend(plain_added);
    entries.extend(renamed);
    entries.extend(
        removed
            .into_iter()
            .filter(|p| !rename_sources.contains(p))
            .map(StatusEntry::Removed),
    );
    entries.extend(copied);
    entries.extend(missing.into_iter().map(StatusEntry::Missing));
    entries
}
