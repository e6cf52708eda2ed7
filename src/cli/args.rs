// src/cli/args.rs
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "microbranch",
    version,
    about = "Staging areas, shelves and branch switching for Mercurial"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage pending changes into a named area
    Stage {
        /// Substrings selecting status lines to stage
        filters: Vec<String>,
        #[arg(long, short, default_value = "default")]
        area: String,
        /// Freeze a copy of each file instead of tracking it live
        #[arg(long, short)]
        snapshot: bool,
        /// Delete the whole area
        #[arg(long)]
        erase: bool,
        #[arg(long, short)]
        quiet: bool,
    },
    /// Remove entries from a staging area
    Unstage {
        filters: Vec<String>,
        #[arg(long, short, default_value = "default")]
        area: String,
        #[arg(long)]
        erase: bool,
        #[arg(long, short)]
        quiet: bool,
    },
    /// List staged entries
    Staged {
        /// Only this area
        area: Option<String>,
    },
    /// Commit the entries of one staging area
    Commit {
        #[arg(long, short)]
        area: Option<String>,
        #[arg(long, short)]
        message: String,
    },
    /// Archive pending changes as a shelf and revert them
    Shelve {
        #[arg(default_value = "shelf")]
        name: String,
        #[arg(long, short)]
        comment: Option<String>,
        /// Only shelve status lines containing this
        #[arg(long, short)]
        include: Option<String>,
        /// Skip status lines containing this (repeatable)
        #[arg(long, short = 'x')]
        exclude: Vec<String>,
        /// Unmanaged file to archive as well (repeatable)
        #[arg(long = "extra", value_name = "PATH")]
        extra_files: Vec<String>,
        /// Keep the changes in the working copy
        #[arg(long)]
        no_revert: bool,
        /// Include IDE session files
        #[arg(long)]
        ide_state: bool,
        #[arg(long, short)]
        quiet: bool,
    },
    /// List shelves
    Shelved {
        name: Option<String>,
        /// Show each shelf's entries
        #[arg(long, short)]
        detailed: bool,
    },
    /// Restore a shelf into a clean working copy
    Restore {
        #[arg(default_value = "shelf")]
        name: String,
        /// Overwrite files changed since shelving instead of merging
        #[arg(long)]
        overwrite: bool,
        /// Delete the shelf after restoring
        #[arg(long)]
        erase: bool,
        #[arg(long, short)]
        quiet: bool,
    },
    /// Report entries a restore would have to merge
    Conflicts {
        #[arg(default_value = "shelf")]
        name: String,
    },
    /// Shelve current work, update to a branch and restore its work
    Switch { branch: String },
}
