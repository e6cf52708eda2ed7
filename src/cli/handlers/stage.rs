// src/cli/handlers/stage.rs
//! Handlers for the staging commands.

use super::{colorize, Session};
use crate::error::MicrobranchError;
use crate::exit::MicrobranchExit;
use crate::stage::{self, StageOutcome, UnstageOutcome};
use anyhow::Result;
use colored::Colorize;

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("  {}", colorize(line));
    }
}

/// Handles the stage command.
///
/// # Errors
/// Returns error if staging fails.
pub fn handle_stage(
    session: &Session,
    area: &str,
    filters: &[String],
    snapshot: bool,
    erase: bool,
    quiet: bool,
) -> Result<MicrobranchExit> {
    let outcome = stage::stage(&session.ctx, &session.vcs, area, filters, snapshot, erase)?;
    if quiet {
        return Ok(MicrobranchExit::Success);
    }

    match outcome {
        StageOutcome::Erased { existed: true } => {
            println!("All staged entries in \"{area}\" cleared.");
        }
        StageOutcome::Erased { existed: false } => {
            println!("{}", format!("No staging area \"{area}\" to clear.").dimmed());
        }
        StageOutcome::Staged {
            added,
            refreshed,
            purged,
        } => {
            let kind = if snapshot { "snapshot" } else { "reference" };
            if !added.is_empty() {
                println!("The following new {kind} entries were added to the \"{area}\" staging area:");
                print_lines(&added);
            }
            if !refreshed.is_empty() {
                println!("The following entries were refreshed in the \"{area}\" staging area:");
                print_lines(&refreshed);
            }
            if added.is_empty() && refreshed.is_empty() {
                println!("No unique entries were added to the \"{area}\" staging area.");
            }
            for path in purged {
                println!("{}", format!("  purged {path} (no longer pending)").dimmed());
            }
        }
    }
    Ok(MicrobranchExit::Success)
}

/// Handles the unstage command.
///
/// # Errors
/// Returns error if unstaging fails.
pub fn handle_unstage(
    session: &Session,
    area: &str,
    filters: &[String],
    erase: bool,
    quiet: bool,
) -> Result<MicrobranchExit> {
    let outcome = stage::unstage(&session.ctx, area, filters, erase)?;
    if quiet {
        return Ok(MicrobranchExit::Success);
    }

    match outcome {
        UnstageOutcome::Erased { .. } => {
            println!("All entries in the \"{area}\" staging area were cleared.");
        }
        UnstageOutcome::Unstaged {
            removed,
            area_removed,
        } => {
            println!("The following existing entries were removed from the \"{area}\" staging area:");
            for path in &removed {
                println!("  {}", path.red());
            }
            if area_removed {
                println!("{}", format!("Staging area \"{area}\" is now empty and was removed.").dimmed());
            }
        }
    }
    Ok(MicrobranchExit::Success)
}

/// Handles the staged command.
///
/// # Errors
/// Returns `NothingStaged` when no area has entries.
pub fn handle_staged(session: &Session, area: Option<&str>) -> Result<MicrobranchExit> {
    let listing = stage::list_staged(&session.ctx, &session.vcs, area, session.config.tag_style)?;

    for warning in &listing.warnings {
        eprintln!("{} {warning}", "WARNING:".yellow());
    }
    if listing.is_empty() {
        return Err(MicrobranchError::NothingStaged.into());
    }

    for area in &listing.areas {
        println!("The following entries are pending in the \"{}\" staging area:", area.name);
        for entry in &area.entries {
            println!("  {} ({})", colorize(&entry.line), entry.tag.to_string().dimmed());
        }
    }
    Ok(MicrobranchExit::Success)
}

/// Handles the commit command.
///
/// # Errors
/// Returns error if the staged commit fails.
pub fn handle_commit(
    session: &Session,
    area: Option<&str>,
    message: &str,
) -> Result<MicrobranchExit> {
    let outcome = stage::commit_staged(&session.ctx, &session.vcs, area, message)?;

    println!("Committed the \"{}\" staging area:", outcome.area);
    for path in &outcome.committed {
        let marker = if outcome.swapped.contains(path) { " (snapshot)" } else { "" };
        println!("  {}{}", path.green(), marker.dimmed());
    }
    for path in &outcome.skipped {
        println!("  {}", format!("? {path} (missing, skipped)").dimmed());
    }
    if !outcome.output.trim().is_empty() {
        println!("{}", outcome.output.trim());
    }
    Ok(MicrobranchExit::Success)
}
