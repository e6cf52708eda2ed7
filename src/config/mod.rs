// src/config/mod.rs
pub mod types;

pub use self::types::{Config, MicrobranchToml, TagStyle, DEFAULT_BACKUP_RETENTION};

use crate::error::{MicrobranchError, Result};
use crate::merge::ExternalMergeTool;
use std::fs;
use std::path::Path;

/// Name of the optional per-working-copy settings file.
pub const CONFIG_FILE: &str = "microbranch.toml";

pub const ENV_ARCHIVER: &str = "MB_ARCHIVER";
pub const ENV_MERGE_TOOL: &str = "MB_MERGE_TOOL";
pub const ENV_SNAPSHOT_AS_TIMESTAMP: &str = "MB_SNAPSHOT_AS_TIMESTAMP";
pub const ENV_ROOT: &str = "MB_ROOT";

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `microbranch.toml` from the working-copy root (if present), then
    /// applies environment overrides.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::from_toml(load_toml(root)?);
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(archiver) = lookup(ENV_ARCHIVER).filter(|v| !v.trim().is_empty()) {
            self.archiver = archiver;
        }
        if let Some(tool) = lookup(ENV_MERGE_TOOL).filter(|v| !v.trim().is_empty()) {
            self.merge_tool = Some(tool);
        }
        if let Some(flag) = lookup(ENV_SNAPSHOT_AS_TIMESTAMP) {
            self.tag_style = if is_truthy(&flag) {
                TagStyle::Timestamp
            } else {
                TagStyle::Elapsed
            };
        }
        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.trim().is_empty()) {
            self.shelf_root = Some(root.into());
        }
    }

    /// Merge tool from the settings, else the platform default.
    ///
    /// # Errors
    /// Returns `Config` when the configured command cannot be split.
    pub fn merge_tool(&self) -> Result<Option<ExternalMergeTool>> {
        match &self.merge_tool {
            Some(cmd) => ExternalMergeTool::from_command(cmd),
            None => Ok(ExternalMergeTool::platform_default()),
        }
    }
}

fn load_toml(root: &Path) -> Result<MicrobranchToml> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(MicrobranchToml::default());
    }
    let content = fs::read_to_string(&path).map_err(MicrobranchError::io(&path))?;
    toml::from_str(&content)
        .map_err(|e| MicrobranchError::Config(format!("{}: {e}", path.display())))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "True" | "TRUE")
}
