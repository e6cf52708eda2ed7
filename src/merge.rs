// src/merge.rs
//! The interactive merge tool used when a shelved file conflicts with the
//! live one.
//!
//! Merge tools give no usable exit status. Whether anything was merged is
//! inferred by the caller from a digest of the shelved copy taken before and
//! after the tool runs.

use crate::error::{MicrobranchError, Result};
use std::path::Path;
use std::process::Command;

pub trait MergeTool {
    /// Lets the user reconcile `shelved` and `live` in place.
    fn merge(&self, shelved: &Path, live: &Path) -> Result<()>;
}

/// Runs a user-configured command line with the two paths appended.
pub struct ExternalMergeTool {
    program: String,
    args: Vec<String>,
}

impl ExternalMergeTool {
    /// Splits a command line such as `meld --auto-merge` into program and
    /// leading arguments, with POSIX shell quoting. Returns `None` for a blank
    /// command.
    ///
    /// # Errors
    /// Returns `Config` when the quoting is unbalanced.
    pub fn from_command(command: &str) -> Result<Option<Self>> {
        let parts = shell_words::split(command)
            .map_err(|e| MicrobranchError::Config(format!("merge tool \"{command}\": {e}")))?;
        let mut parts = parts.into_iter();
        let Some(program) = parts.next() else {
            return Ok(None);
        };
        Ok(Some(Self {
            program,
            args: parts.collect(),
        }))
    }

    /// Tool used when nothing is configured.
    #[must_use]
    pub fn platform_default() -> Option<Self> {
        cfg!(windows).then(|| Self {
            program: "WinMergeU".to_string(),
            args: Vec::new(),
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl MergeTool for ExternalMergeTool {
    fn merge(&self, shelved: &Path, live: &Path) -> Result<()> {
        // exit status deliberately ignored; see module docs
        let _ = Command::new(&self.program)
            .args(&self.args)
            .arg(shelved)
            .arg(live)
            .status()
            .map_err(|e| MicrobranchError::Config(format!("cannot run merge tool {}: {e}", self.program)))?;
        Ok(())
    }
}
