//! Command dispatch, kept out of the binary.

use super::args::Commands;
use super::handlers::{self, shelf, stage, Session};
use crate::exit::MicrobranchExit;
use anyhow::{anyhow, Result};

/// Executes the parsed command.
///
/// # Errors
/// Returns error if the working copy cannot be resolved or the handler fails.
pub fn execute(command: Commands) -> Result<MicrobranchExit> {
    let session = Session::open()?;

    match command {
        Commands::Stage { .. } | Commands::Unstage { .. } | Commands::Staged { .. } => {
            handle_staging(&session, command)
        }
        Commands::Commit { area, message } => {
            stage::handle_commit(&session, area.as_deref(), &message)
        }
        _ => handle_shelves(&session, command),
    }
}

fn handle_staging(session: &Session, command: Commands) -> Result<MicrobranchExit> {
    match command {
        Commands::Stage {
            filters,
            area,
            snapshot,
            erase,
            quiet,
        } => stage::handle_stage(session, &area, &filters, snapshot, erase, quiet),
        Commands::Unstage {
            filters,
            area,
            erase,
            quiet,
        } => stage::handle_unstage(session, &area, &filters, erase, quiet),
        Commands::Staged { area } => stage::handle_staged(session, area.as_deref()),
        _ => Err(anyhow!("Internal error: Invalid staging command")),
    }
}

fn handle_shelves(session: &Session, command: Commands) -> Result<MicrobranchExit> {
    handlers::warn_shelf_root(session);
    match command {
        Commands::Shelve {
            name,
            comment,
            include,
            exclude,
            extra_files,
            no_revert,
            ide_state,
            quiet,
        } => {
            let opts = crate::shelf::ShelveOptions {
                name,
                comment,
                include,
                excludes: exclude,
                extra_files,
                no_revert,
                ide_state,
            };
            shelf::handle_shelve(session, &opts, quiet)
        }
        Commands::Shelved { name, detailed } => {
            shelf::handle_shelved(session, name.as_deref(), detailed)
        }
        Commands::Restore {
            name,
            overwrite,
            erase,
            quiet,
        } => {
            let opts = crate::shelf::RestoreOptions {
                name,
                overwrite,
                erase_after: erase,
            };
            shelf::handle_restore(session, &opts, quiet)
        }
        Commands::Conflicts { name } => shelf::handle_conflicts(session, &name),
        Commands::Switch { branch } => shelf::handle_switch(session, &branch),
        _ => Err(anyhow!("Internal error: Invalid shelf command")),
    }
}
