// src/switch.rs
//! Moving the working copy to another branch without losing pending work.
//!
//! Work in progress is shelved under the current branch's name before the
//! update, and work previously shelved for the target branch is restored
//! after it. Shelves for this live in `<shelf-root>/switch/`.

use crate::context::WorkingCopyContext;
use crate::error::{MicrobranchError, Result};
use crate::events::{EventKind, EventLogger};
use crate::shelf::{
    restore, shelve, RestoreOptions, RestoreReport, ShelfFiles, ShelveOptions, ShelveOutcome,
    ShelveSummary, Tools,
};
use std::fmt;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    Validating,
    ShelvingCurrent,
    UpdatingBranch,
    RestoringTarget,
    Done,
    /// The update failed; current work was put back.
    UpdateFailed,
    /// The target's shelf could not be applied; current work stays shelved.
    RestoreFailed,
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::ShelvingCurrent => "shelving current work",
            Self::UpdatingBranch => "updating branch",
            Self::RestoringTarget => "restoring target work",
            Self::Done => "done",
            Self::UpdateFailed => "update failed",
            Self::RestoreFailed => "restore failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub struct SwitchReport {
    pub from: String,
    pub to: String,
    pub visited: Vec<SwitchState>,
    pub shelved_current: Option<ShelveSummary>,
    pub restored: Option<RestoreReport>,
    /// Manifest the consumed target shelf was renamed to.
    pub backup: Option<PathBuf>,
}

struct Run<'a> {
    ctx: &'a WorkingCopyContext,
    target: &'a str,
    visited: Vec<SwitchState>,
    logger: EventLogger,
}

impl Run<'_> {
    fn enter(&mut self, state: SwitchState) {
        self.visited.push(state);
    }

    fn fail(&mut self, state: SwitchState, reason: String) -> MicrobranchError {
        self.enter(state);
        self.logger.log(EventKind::SwitchFailed {
            target: self.target.to_string(),
            state: state.to_string(),
        });
        MicrobranchError::SwitchFailed {
            target: self.target.to_string(),
            state: state.to_string(),
            reason,
        }
    }

    fn current(&self) -> &str {
        &self.ctx.branch
    }
}

/// Switches the working copy to `target`.
///
/// # Errors
/// `UnknownBranch` before anything changes; `SwitchFailed` naming the state
/// that failed otherwise.
pub fn switch(
    ctx: &WorkingCopyContext,
    tools: &Tools<'_>,
    target: &str,
) -> Result<SwitchReport> {
    let mut run = Run {
        ctx,
        target,
        visited: vec![SwitchState::Idle],
        logger: EventLogger::for_context(ctx),
    };

    run.enter(SwitchState::Validating);
    if !tools.vcs.branches()?.iter().any(|b| b == target) {
        return Err(MicrobranchError::UnknownBranch(target.to_string()));
    }

    let switch_root = ctx.switch_shelf_root();
    fs::create_dir_all(&switch_root).map_err(MicrobranchError::io(&switch_root))?;
    let switch_ctx = ctx.clone().with_shelf_root(&switch_root);
    let ext = tools.archiver.extension();
    let current_files = ShelfFiles::new(&switch_root, run.current(), ext);

    let mut shelved_current = None;
    if tools.vcs.is_dirty()? {
        run.enter(SwitchState::ShelvingCurrent);
        let (old_manifest, old_archive) = current_files.retired();
        for stale in [old_manifest, old_archive] {
            if stale.exists() {
                fs::remove_file(&stale).map_err(MicrobranchError::io(&stale))?;
            }
        }
        match shelve(&switch_ctx, tools, &ShelveOptions::new(run.current())) {
            Ok(ShelveOutcome::Shelved(summary)) => shelved_current = Some(summary),
            Ok(ShelveOutcome::NothingToShelve) => {}
            Err(e) => return Err(run.fail(SwitchState::ShelvingCurrent, e.to_string())),
        }
    }

    run.enter(SwitchState::UpdatingBranch);
    if let Err(e) = tools.vcs.update(target) {
        let mut reason = e.to_string();
        if shelved_current.is_some() {
            let put_back = restore(&switch_ctx, tools, &RestoreOptions::new(run.current()))
                .and_then(|_| current_files.retire());
            if let Err(re) = put_back {
                reason = format!("{reason}; putting back current work also failed: {re}");
            }
        }
        return Err(run.fail(SwitchState::UpdateFailed, reason));
    }

    run.enter(SwitchState::RestoringTarget);
    let target_files = ShelfFiles::new(&switch_root, target, ext);
    let mut restored = None;
    let mut backup = None;
    if target_files.exists() {
        let opts = RestoreOptions {
            overwrite: true,
            ..RestoreOptions::new(target)
        };
        match restore(&switch_ctx.on_branch(target), tools, &opts) {
            Ok(report) => restored = Some(report),
            Err(e) => return Err(run.fail(SwitchState::RestoreFailed, e.to_string())),
        }
        target_files.retire()?;
        backup = Some(target_files.retired().0);
    }

    run.enter(SwitchState::Done);
    run.logger.log(EventKind::SwitchCompleted {
        from: ctx.branch.clone(),
        to: target.to_string(),
    });

    Ok(SwitchReport {
        from: ctx.branch.clone(),
        to: target.to_string(),
        visited: run.visited,
        shelved_current,
        restored,
        backup,
    })
}
