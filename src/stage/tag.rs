// src/stage/tag.rs
//! Listing tags for staged entries.

use crate::config::TagStyle;
use crate::error::{MicrobranchError, Result};
use chrono::{DateTime, Local, Utc};
use filetime::FileTime;
use std::fmt;
use std::fs;
use std::path::Path;

const ONE_YEAR: u64 = 31_536_000;
const ONE_MONTH: u64 = 2_592_000;
const ONE_WEEK: u64 = 604_800;
const ONE_DAY: u64 = 86_400;
const ONE_HOUR: u64 = 3_600;
const ONE_MINUTE: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotTag {
    /// `&`: tracks the live file.
    Reference,
    /// `=`: snapshot has the live file's mtime.
    Identical,
    /// Time between snapshot and live file.
    Elapsed(String),
    /// Absolute time the snapshot was taken.
    Timestamp(String),
    /// Snapshot whose source file no longer exists.
    SourceMissing,
}

impl fmt::Display for SnapshotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "&"),
            Self::Identical => write!(f, "="),
            Self::Elapsed(s) | Self::Timestamp(s) => write!(f, "{s}"),
            Self::SourceMissing => write!(f, "!"),
        }
    }
}

/// Formats a duration in whole seconds as `1y2M3w4d5h6m7s`, omitting zero
/// leading units. Seconds are always present.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let mut rest = seconds;
    let mut out = String::new();
    for (unit, suffix) in [
        (ONE_YEAR, 'y'),
        (ONE_MONTH, 'M'),
        (ONE_WEEK, 'w'),
        (ONE_DAY, 'd'),
        (ONE_HOUR, 'h'),
        (ONE_MINUTE, 'm'),
    ] {
        if rest >= unit {
            out.push_str(&format!("{}{suffix}", rest / unit));
            rest %= unit;
        }
    }
    out.push_str(&format!("{rest}s"));
    out
}

pub(crate) fn mtime_seconds(path: &Path) -> Result<i64> {
    let meta = fs::metadata(path).map_err(MicrobranchError::io(path))?;
    Ok(FileTime::from_last_modification_time(&meta).unix_seconds())
}

/// Tag for a snapshot file compared with its live source.
///
/// # Errors
/// Returns error if the snapshot file cannot be inspected.
pub fn snapshot_tag(snapshot: &Path, source: &Path, style: TagStyle) -> Result<SnapshotTag> {
    let snap_secs = mtime_seconds(snapshot)?;

    if style == TagStyle::Timestamp {
        let stamp = DateTime::<Utc>::from_timestamp(snap_secs, 0)
            .map(|utc| utc.with_timezone(&Local).format("%a %b %e %H:%M:%S %Y").to_string())
            .unwrap_or_else(|| snap_secs.to_string());
        return Ok(SnapshotTag::Timestamp(stamp));
    }

    if !source.exists() {
        return Ok(SnapshotTag::SourceMissing);
    }
    let source_secs = mtime_seconds(source)?;
    if source_secs == snap_secs {
        Ok(SnapshotTag::Identical)
    } else {
        Ok(SnapshotTag::Elapsed(format_elapsed(
            source_secs.abs_diff(snap_secs),
        )))
    }
}
