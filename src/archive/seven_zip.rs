// src/archive/seven_zip.rs
use super::Archiver;
use crate::error::{MicrobranchError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Line 7-Zip prints when an operation fully succeeded. The exit status alone
/// is not trusted.
const SUCCESS_MARKER: &str = "Everything is Ok";

/// `Archiver` over the 7-Zip command line.
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String], cwd: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| MicrobranchError::ArchiveError {
                detail: format!("failed to run {}: {e}", self.program.display()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if has_success_marker(&stdout) {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(MicrobranchError::ArchiveError {
            detail: format!("{}\n{}", stdout.trim(), stderr.trim())
                .trim()
                .to_string(),
        })
    }
}

impl Archiver for SevenZip {
    fn extension(&self) -> &str {
        "7z"
    }

    fn create(&self, archive: &Path, base: &Path, files: &[String]) -> Result<()> {
        let mut list = tempfile::Builder::new()
            .prefix("microbranch")
            .suffix(".list")
            .tempfile()?;
        for file in files {
            writeln!(list, "{file}")?;
        }
        list.flush()?;

        let args = vec![
            "a".to_string(),
            archive.display().to_string(),
            format!("@{}", list.path().display()),
        ];
        self.run(&args, base)
    }

    fn extract_all(&self, archive: &Path, dest: &Path) -> Result<()> {
        let args = vec![
            "x".to_string(),
            "-y".to_string(),
            format!("-o{}", dest.display()),
            archive.display().to_string(),
        ];
        let cwd = dest.parent().unwrap_or(dest);
        self.run(&args, cwd)
    }

    fn extract_one(&self, archive: &Path, dest: &Path, file: &str) -> Result<()> {
        let args = vec![
            "x".to_string(),
            "-y".to_string(),
            format!("-o{}", dest.display()),
            archive.display().to_string(),
            file.to_string(),
        ];
        self.run(&args, dest)
    }
}

fn has_success_marker(output: &str) -> bool {
    output.lines().any(|line| line.trim_end() == SUCCESS_MARKER)
}
