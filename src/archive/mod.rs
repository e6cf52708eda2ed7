// src/archive/mod.rs
//! The archiving tool that packs shelved files into one container.

mod seven_zip;

pub use seven_zip::SevenZip;

use crate::error::Result;
use std::path::Path;

pub trait Archiver {
    /// File extension of produced containers, without the dot.
    fn extension(&self) -> &str;

    /// Packs `files` (relative to `base`; directories are packed recursively)
    /// into `archive`.
    fn create(&self, archive: &Path, base: &Path, files: &[String]) -> Result<()>;

    /// Unpacks everything into `dest`.
    fn extract_all(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Unpacks the single entry `file` into `dest`, keeping its relative path.
    fn extract_one(&self, archive: &Path, dest: &Path, file: &str) -> Result<()>;
}
