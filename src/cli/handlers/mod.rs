// src/cli/handlers/mod.rs
//! Command handlers and the shared session they run in.

use crate::archive::{Archiver, SevenZip};
use crate::config::Config;
use crate::context::WorkingCopyContext;
use crate::error::MicrobranchError;
use crate::merge::ExternalMergeTool;
use crate::shelf::Tools;
use crate::vcs::{HgClient, Vcs};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

pub mod shelf;
pub mod stage;

/// Collaborators and context resolved once per invocation.
pub struct Session {
    pub ctx: WorkingCopyContext,
    pub config: Config,
    pub vcs: HgClient,
    pub archiver: SevenZip,
    pub merge_tool: Option<ExternalMergeTool>,
}

impl Session {
    /// Resolves the working copy containing the current directory.
    ///
    /// # Errors
    /// Returns error outside a working copy or when `microbranch.toml` is
    /// malformed.
    pub fn open() -> Result<Self> {
        let cwd = std::env::current_dir().context("reading the current directory")?;
        let root = HgClient::new(&cwd)
            .root()
            .map_err(|_| MicrobranchError::NotInWorkingCopy)?;
        let config = Config::load(&root)?;
        let vcs = HgClient::new(&root);
        let ctx = WorkingCopyContext::discover(&vcs, &config)?;

        Ok(Self {
            archiver: SevenZip::new(config.archiver.as_str()),
            merge_tool: config.merge_tool()?,
            ctx,
            config,
            vcs,
        })
    }

    #[must_use]
    pub fn archiver_ext(&self) -> &str {
        self.archiver.extension()
    }

    #[must_use]
    pub fn tools(&self) -> Tools<'_> {
        let tools = Tools::new(&self.vcs, &self.archiver)
            .with_backup_retention(self.config.backup_retention);
        match &self.merge_tool {
            Some(tool) => tools.with_merge_tool(tool),
            None => tools,
        }
    }
}

/// Tells the user when shelves are going somewhere they did not configure.
pub fn warn_shelf_root(session: &Session) {
    if session.ctx.shelf_root_fallback {
        eprintln!(
            "{} Setting shelf root to \"{}\". Was this intended?",
            "Warning:".yellow(),
            session.ctx.shelf_root.display()
        );
    }
}

/// Colors a status-style line by its leading action letter.
#[must_use]
pub fn colorize(line: &str) -> ColoredString {
    match line.chars().next() {
        Some('M') => line.yellow(),
        Some('A') => line.green(),
        Some('R') => line.red(),
        Some('V') => line.cyan(),
        Some('X') => line.magenta(),
        Some('?') => line.dimmed(),
        _ => line.normal(),
    }
}
