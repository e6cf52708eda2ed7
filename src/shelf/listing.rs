// src/shelf/listing.rs
use super::location::{decode_name, ShelfFiles, MANIFEST_EXT};
use super::manifest::ShelfManifest;
use crate::error::{MicrobranchError, Result};
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct ShelfSummary {
    pub files: ShelfFiles,
    /// `None` when the manifest cannot be parsed.
    pub manifest: Option<ShelfManifest>,
}

/// Every shelf in `shelf_root`, sorted by name. Rotated backups are not
/// shelves and are left out.
///
/// # Errors
/// Returns error if the directory exists but cannot be read.
pub fn list_shelves(shelf_root: &Path, archive_ext: &str) -> Result<Vec<ShelfSummary>> {
    if !shelf_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut shelves: Vec<ShelfSummary> = fs::read_dir(shelf_root)
        .map_err(MicrobranchError::io(shelf_root))?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let path = e.path();
            let is_manifest = path.extension().is_some_and(|ext| ext == MANIFEST_EXT);
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            is_manifest.then_some(stem)
        })
        .map(|stem| {
            let files = ShelfFiles::new(shelf_root, &decode_name(&stem), archive_ext);
            let manifest = ShelfManifest::load(&files.manifest).ok();
            ShelfSummary { files, manifest }
        })
        .collect();

    shelves.sort_by(|a, b| a.files.name.cmp(&b.files.name));
    Ok(shelves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_lists_manifests_only() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("wip.manifest"), "version 2\nhalf done\nA?a.c?\n")?;
        fs::write(dir.path().join("wip.7z"), "")?;
        fs::write(dir.path().join("wip.manifest.65f0a1b2"), "version 2\nold\n")?;
        fs::write(dir.path().join("feature%2Fx.manifest"), "version 2\n\n")?;
        fs::write(dir.path().join("broken.manifest"), "version x\n")?;

        let shelves = list_shelves(dir.path(), "7z")?;
        let names: Vec<&str> = shelves.iter().map(|s| s.files.name.as_str()).collect();
        assert_eq!(names, vec!["broken", "feature/x", "wip"]);
        assert!(shelves[0].manifest.is_none());
        assert_eq!(
            shelves[2].manifest.as_ref().map(|m| m.comment.as_str()),
            Some("half done")
        );
        Ok(())
    }

    #[test]
    fn test_missing_root_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(list_shelves(&dir.path().join("none"), "7z")?.is_empty());
        Ok(())
    }
}
