// src/events.rs
//! Machine-readable event logging for audit trails.
//!
//! Events are appended to `.hg/microbranch/events.jsonl`.

use crate::context::WorkingCopyContext;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Staged {
        area: String,
        paths: Vec<String>,
        snapshot: bool,
    },
    Unstaged {
        area: String,
        paths: Vec<String>,
    },
    AreaErased {
        area: String,
    },
    OrphansPurged {
        area: String,
        paths: Vec<String>,
    },
    StagedCommitted {
        area: String,
        files: usize,
    },
    Shelved {
        name: String,
        entries: usize,
        reverted: bool,
    },
    ShelfRotated {
        name: String,
        backup: String,
    },
    Restored {
        name: String,
        restored: usize,
        skipped: usize,
    },
    RolledBack {
        operation: String,
        undone: usize,
        failed: Vec<String>,
    },
    SwitchCompleted {
        from: String,
        to: String,
    },
    SwitchFailed {
        target: String,
        state: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MicrobranchEvent {
    pub timestamp: u64,
    pub kind: EventKind,
}

#[derive(Clone)]
pub struct EventLogger {
    log_path: PathBuf,
}

impl EventLogger {
    #[must_use]
    pub fn new(control_dir: &Path) -> Self {
        let log_path = control_dir.join("microbranch").join("events.jsonl");
        Self { log_path }
    }

    #[must_use]
    pub fn for_context(ctx: &WorkingCopyContext) -> Self {
        Self::new(&ctx.control_dir)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, kind: EventKind) {
        // best-effort
        if let Ok(json) = Self::serialize_event(kind) {
            let _ = self.append_to_file(&json);
        }
    }

    fn serialize_event(kind: EventKind) -> Result<String> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let event = MicrobranchEvent { timestamp, kind };
        Ok(serde_json::to_string(&event)?)
    }

    fn append_to_file(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_events_append_as_json_lines() -> Result<()> {
        let dir = TempDir::new()?;
        let logger = EventLogger::new(dir.path());
        logger.log(EventKind::AreaErased {
            area: "default".into(),
        });
        logger.log(EventKind::Shelved {
            name: "wip".into(),
            entries: 1,
            reverted: true,
        });

        let text = fs::read_to_string(logger.path())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let event: MicrobranchEvent = serde_json::from_str(lines[1])?;
        assert!(matches!(event.kind, EventKind::Shelved { entries: 1, .. }));
        Ok(())
    }
}
