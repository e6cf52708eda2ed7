// src/vcs/hg.rs
use super::status::{parse_status_output, StatusEntry};
use super::Vcs;
use crate::error::{MicrobranchError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

const HG: &str = "hg";

/// `Vcs` over the Mercurial command line.
pub struct HgClient {
    cwd: PathBuf,
}

impl HgClient {
    /// Creates a client that runs every command from `cwd`.
    #[must_use]
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }

    fn run_hg(&self, args: &[&str]) -> Result<String> {
        let command = format!("{HG} {}", args.join(" "));
        let output = Command::new(HG)
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .map_err(|e| MicrobranchError::Vcs {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(MicrobranchError::Vcs { command, detail });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for HgClient {
    fn root(&self) -> Result<PathBuf> {
        let out = self
            .run_hg(&["root"])
            .map_err(|_| MicrobranchError::NotInWorkingCopy)?;
        Ok(PathBuf::from(out.trim()))
    }

    fn current_branch(&self) -> Result<String> {
        let out = self.run_hg(&["branch"])?;
        let branch = out.trim();
        if branch.is_empty() {
            return Err(MicrobranchError::NoBranch);
        }
        Ok(branch.to_string())
    }

    fn branches(&self) -> Result<Vec<String>> {
        let out = self.run_hg(&["branches"])?;
        Ok(parse_branches(&out))
    }

    fn status(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_hg(&["status", "-q", "-C"])?;
        Ok(parse_status_output(&out))
    }

    fn add(&self, path: &str) -> Result<()> {
        self.run_hg(&["add", path]).map(drop)
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.run_hg(&["remove", path]).map(drop)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.run_hg(&["mv", from, to]).map(drop)
    }

    fn revert(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["revert", "--no-backup"];
        args.extend(paths.iter().map(String::as_str));
        self.run_hg(&args).map(drop)
    }

    fn revert_all(&self) -> Result<()> {
        self.run_hg(&["revert", "--all", "--no-backup"]).map(drop)
    }

    fn update(&self, branch: &str) -> Result<()> {
        self.run_hg(&["update", branch]).map(drop)
    }

    fn changeset_for(&self, branch: &str, path: &str) -> Result<Option<String>> {
        let on_branch = self.run_hg(&["log", "-l", "1", "-b", branch, path]);
        let out = match on_branch {
            Ok(out) if !out.trim().is_empty() => out,
            // no changes for this branch; use the latest change instead
            _ => self.run_hg(&["log", "-l", "1", path])?,
        };
        Ok(parse_changeset(&out))
    }

    fn commit(&self, paths: &[String], message: &str) -> Result<String> {
        let mut args = vec!["commit", "-m", message];
        args.extend(paths.iter().map(String::as_str));
        self.run_hg(&args)
    }
}

/// Extracts branch names from `hg branches` output
/// (`name    42:0123abcd (inactive)`).
#[must_use]
pub fn parse_branches(output: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r"^(\S+)\s+-?\d+:[0-9a-f]+") else {
        return Vec::new();
    };
    output
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extracts the id from the first `changeset:` line of `hg log` output.
#[must_use]
pub fn parse_changeset(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("changeset:"))
        .map(|rest| rest.trim().to_string())
        .filter(|id| !id.is_empty())
}
