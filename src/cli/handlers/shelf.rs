// src/cli/handlers/shelf.rs
//! Handlers for shelving, restoring and branch switching.

use super::{colorize, Session};
use crate::error::MicrobranchError;
use crate::exit::MicrobranchExit;
use crate::shelf::{
    self, EntryOutcome, RestoreOptions, RestoreReport, ShelveOptions, ShelveOutcome,
};
use crate::switch;
use anyhow::{Context, Result};
use colored::Colorize;

/// Handles the shelve command.
///
/// # Errors
/// Returns error if the shelf cannot be built.
pub fn handle_shelve(session: &Session, opts: &ShelveOptions, quiet: bool) -> Result<MicrobranchExit> {
    let outcome = shelf::shelve(&session.ctx, &session.tools(), opts)
        .with_context(|| format!("shelving \"{}\"", opts.name))?;

    let summary = match outcome {
        ShelveOutcome::NothingToShelve => {
            if !quiet {
                println!("Nothing to shelve.");
            }
            return Ok(MicrobranchExit::Success);
        }
        ShelveOutcome::Shelved(summary) => summary,
    };
    if quiet {
        return Ok(MicrobranchExit::Success);
    }

    println!("Shelved the following state as microbranch \"{}\":", opts.name);
    for entry in &summary.manifest.entries {
        println!("  {}", colorize(&entry.to_string()));
    }
    if let Some(suffix) = &summary.rotated {
        println!("{}", format!("Previous shelf kept as *.{suffix}").dimmed());
    }
    if summary.pruned > 0 {
        println!("{}", format!("Pruned {} old backup(s)", summary.pruned).dimmed());
    }
    if !summary.reverted {
        println!("\nAs requested, changes have been left in the working copy.");
    }
    Ok(MicrobranchExit::Success)
}

/// Handles the shelved command.
///
/// # Errors
/// Returns error if the shelf root cannot be read.
pub fn handle_shelved(session: &Session, name: Option<&str>, detailed: bool) -> Result<MicrobranchExit> {
    let shelves = shelf::list_shelves(&session.ctx.shelf_root, session.archiver_ext())?;
    let shelves: Vec<_> = shelves
        .into_iter()
        .filter(|s| name.map_or(true, |n| s.files.name == n))
        .collect();

    if shelves.is_empty() {
        if let Some(n) = name {
            return Err(MicrobranchError::ShelfNotFound(n.to_string()).into());
        }
        println!("No microbranches found in {}", session.ctx.shelf_root.display());
        return Ok(MicrobranchExit::Success);
    }

    for summary in &shelves {
        let Some(manifest) = &summary.manifest else {
            println!("  \"{}\" {}", summary.files.name, "(unreadable manifest)".red());
            continue;
        };
        if manifest.comment.is_empty() {
            println!("  \"{}\"", summary.files.name.bold());
        } else {
            println!("  \"{}\" ({})", summary.files.name.bold(), manifest.comment);
        }
        if detailed {
            for entry in &manifest.entries {
                println!("    {}", colorize(&entry.to_string()));
            }
        }
    }
    Ok(MicrobranchExit::Success)
}

fn outcome_line(entry: &shelf::RestoredEntry) -> String {
    let line = entry.entry.to_string();
    match entry.outcome {
        EntryOutcome::SkippedMissing
        | EntryOutcome::SkippedNoMergeTool
        | EntryOutcome::SkippedMergeUnchanged => format!("? {}", entry.entry.path()),
        EntryOutcome::Merged => format!("{line} (merged)"),
        EntryOutcome::Restored | EntryOutcome::Registered => line,
    }
}

fn print_restore(report: &RestoreReport) {
    for entry in &report.entries {
        let warning = match entry.outcome {
            EntryOutcome::SkippedMissing => "no longer exists",
            EntryOutcome::SkippedNoMergeTool => "no merge solution available",
            EntryOutcome::SkippedMergeUnchanged => "no merge performed",
            _ => continue,
        };
        eprintln!(
            "{} Skipping '{}'; {warning}...",
            "WARNING:".yellow(),
            entry.entry.path()
        );
    }

    println!("\nRestored the following state from microbranch \"{}\":", report.name);
    for entry in &report.entries {
        println!("  {}", colorize(&outcome_line(entry)));
    }
    if report.staging_restored {
        println!("{}", "Staging areas restored.".dimmed());
    }
    if report.erased {
        println!("Removing cached microbranch \"{}\".", report.name);
    }
    if let Some(warning) = &report.scratch_warning {
        eprintln!("{} {warning}", "WARNING:".yellow());
    }
}

fn restore_exit(report: &RestoreReport) -> MicrobranchExit {
    if report.skipped_count() > 0 {
        MicrobranchExit::Skipped
    } else {
        MicrobranchExit::Success
    }
}

/// Handles the restore command.
///
/// # Errors
/// Returns error if the shelf cannot be restored.
pub fn handle_restore(session: &Session, opts: &RestoreOptions, quiet: bool) -> Result<MicrobranchExit> {
    let report = shelf::restore(&session.ctx, &session.tools(), opts)
        .with_context(|| format!("restoring \"{}\"", opts.name))?;
    if !quiet {
        print_restore(&report);
    }
    Ok(restore_exit(&report))
}

/// Handles the conflicts command.
///
/// # Errors
/// Returns error if the manifest cannot be read.
pub fn handle_conflicts(session: &Session, name: &str) -> Result<MicrobranchExit> {
    let report = shelf::check_conflicts(&session.ctx, &session.tools(), name)?;

    if report.is_clean() {
        println!(
            "{}",
            format!(
                "No conflicts: {} entr{} in \"{name}\" apply cleanly.",
                report.checked,
                if report.checked == 1 { "y" } else { "ies" }
            )
            .green()
        );
        return Ok(MicrobranchExit::Success);
    }

    println!("The following entries of \"{name}\" would need merging:");
    for conflict in &report.conflicts {
        println!(
            "  {} {}",
            colorize(&conflict.entry.to_string()),
            format!("({})", conflict.reason).dimmed()
        );
    }
    Ok(MicrobranchExit::Skipped)
}

/// Handles the switch command.
///
/// # Errors
/// Returns error if any stage of the switch fails.
pub fn handle_switch(session: &Session, branch: &str) -> Result<MicrobranchExit> {
    let report = switch::switch(&session.ctx, &session.tools(), branch)?;

    if let Some(shelved) = &report.shelved_current {
        println!(
            "Shelved {} change(s) for \"{}\".",
            shelved.manifest.entries.len(),
            report.from
        );
    }
    println!("{}", format!("Switched to \"{}\".", report.to).green().bold());

    let Some(restored) = &report.restored else {
        return Ok(MicrobranchExit::Success);
    };
    print_restore(restored);
    if let Some(backup) = &report.backup {
        println!("{}", format!("Shelf kept as {}", backup.display()).dimmed());
    }
    Ok(restore_exit(restored))
}
