// tests/common/mod.rs
//! In-process stand-ins for `hg`, `7z` and the merge tool.
//!
//! `FakeVcs` keeps committed contents per branch in memory and the working
//! files on disk. Its `status` renders `hg status -q -C` text and feeds it
//! through the crate's parser, so the engine sees exactly what it would see
//! from Mercurial.

#![allow(dead_code)]

use anyhow::Result;
use filetime::FileTime;
use microbranch_core::archive::Archiver;
use microbranch_core::context::WorkingCopyContext;
use microbranch_core::error::{MicrobranchError, Result as MbResult};
use microbranch_core::merge::MergeTool;
use microbranch_core::vcs::{parse_status_output, StatusEntry, Vcs};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

type Tree = BTreeMap<String, Vec<u8>>;

pub struct FakeVcs {
    root: PathBuf,
    branch: RefCell<String>,
    committed: RefCell<HashMap<String, Tree>>,
    added: RefCell<BTreeSet<String>>,
    removed: RefCell<BTreeSet<String>>,
    copies: RefCell<BTreeMap<String, String>>,
    changesets: RefCell<HashMap<String, String>>,
    pub commits: RefCell<Vec<(Vec<String>, String)>>,
    pub fail_update: Cell<bool>,
    pub fail_commit: Cell<bool>,
    /// `revert_all` gives up after the first path.
    pub fail_revert: Cell<bool>,
}

fn vcs_error(command: &str, detail: &str) -> MicrobranchError {
    MicrobranchError::Vcs {
        command: command.to_string(),
        detail: detail.to_string(),
    }
}

impl FakeVcs {
    /// Working copy at `root` on `branch`, with `files` committed.
    pub fn new(root: &Path, branch: &str, files: &[(&str, &str)]) -> Result<Self> {
        fs::create_dir_all(root.join(".hg"))?;
        let tree: Tree = files
            .iter()
            .map(|(p, c)| ((*p).to_string(), c.as_bytes().to_vec()))
            .collect();
        for (path, bytes) in &tree {
            write_file(&root.join(path), bytes)?;
        }
        let mut committed = HashMap::new();
        committed.insert(branch.to_string(), tree);
        Ok(Self {
            root: root.to_path_buf(),
            branch: RefCell::new(branch.to_string()),
            committed: RefCell::new(committed),
            added: RefCell::default(),
            removed: RefCell::default(),
            copies: RefCell::default(),
            changesets: RefCell::default(),
            commits: RefCell::default(),
            fail_update: Cell::new(false),
            fail_commit: Cell::new(false),
            fail_revert: Cell::new(false),
        })
    }

    /// Declares another branch with its committed files.
    pub fn add_branch(&self, branch: &str, files: &[(&str, &str)]) {
        let tree = files
            .iter()
            .map(|(p, c)| ((*p).to_string(), c.as_bytes().to_vec()))
            .collect();
        self.committed.borrow_mut().insert(branch.to_string(), tree);
    }

    /// Sets what `changeset_for` reports for `path`.
    pub fn set_changeset(&self, path: &str, id: &str) {
        self.changesets
            .borrow_mut()
            .insert(path.to_string(), id.to_string());
    }

    pub fn branch(&self) -> String {
        self.branch.borrow().clone()
    }

    pub fn abs(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub fn write(&self, path: &str, text: &str) -> Result<()> {
        write_file(&self.abs(path), text.as_bytes())
    }

    pub fn read(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.abs(path))?)
    }

    pub fn committed_text(&self, branch: &str, path: &str) -> Option<String> {
        self.committed
            .borrow()
            .get(branch)
            .and_then(|t| t.get(path))
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    fn tracked(&self) -> Tree {
        self.committed
            .borrow()
            .get(&self.branch())
            .cloned()
            .unwrap_or_default()
    }

    /// Status text in `hg status -q -C` form.
    pub fn status_text(&self) -> String {
        let tracked = self.tracked();
        let removed = self.removed.borrow();
        let mut modified = Vec::new();
        let mut removed_lines = Vec::new();
        let mut missing = Vec::new();

        for (path, bytes) in &tracked {
            let live = self.abs(path);
            if removed.contains(path) {
                removed_lines.push(format!("R {path}\n"));
            } else if !live.exists() {
                missing.push(format!("! {path}\n"));
            } else if fs::read(&live).ok().as_ref() != Some(bytes) {
                modified.push(format!("M {path}\n"));
            }
        }

        let mut text: String = modified.concat();
        let copies = self.copies.borrow();
        for path in self.added.borrow().iter() {
            text.push_str(&format!("A {path}\n"));
            if let Some(source) = copies.get(path) {
                text.push_str(&format!("  {source}\n"));
            }
        }
        text.push_str(&removed_lines.concat());
        text.push_str(&missing.concat());
        text
    }

    fn revert_path(&self, path: &str) -> MbResult<()> {
        self.added.borrow_mut().remove(path);
        self.copies.borrow_mut().remove(path);
        self.removed.borrow_mut().remove(path);
        if let Some(bytes) = self.tracked().get(path) {
            write_file(&self.abs(path), bytes).map_err(|e| vcs_error("hg revert", &e.to_string()))?;
        }
        Ok(())
    }
}

impl Vcs for FakeVcs {
    fn root(&self) -> MbResult<PathBuf> {
        Ok(self.root.clone())
    }

    fn current_branch(&self) -> MbResult<String> {
        Ok(self.branch())
    }

    fn branches(&self) -> MbResult<Vec<String>> {
        let mut names: Vec<String> = self.committed.borrow().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn status(&self) -> MbResult<Vec<StatusEntry>> {
        Ok(parse_status_output(&self.status_text()))
    }

    fn add(&self, path: &str) -> MbResult<()> {
        if !self.abs(path).exists() {
            return Err(vcs_error("hg add", &format!("{path}: No such file or directory")));
        }
        if self.removed.borrow_mut().remove(path) {
            return Ok(());
        }
        if !self.tracked().contains_key(path) {
            self.added.borrow_mut().insert(path.to_string());
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> MbResult<()> {
        if self.added.borrow_mut().remove(path) {
            self.copies.borrow_mut().remove(path);
            return Ok(());
        }
        if !self.tracked().contains_key(path) {
            return Err(vcs_error("hg remove", &format!("{path}: not tracked")));
        }
        self.removed.borrow_mut().insert(path.to_string());
        let live = self.abs(path);
        if live.exists() {
            fs::remove_file(&live).map_err(|e| vcs_error("hg remove", &e.to_string()))?;
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> MbResult<()> {
        let dest = self.abs(to);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| vcs_error("hg mv", &e.to_string()))?;
        }
        fs::rename(self.abs(from), &dest).map_err(|e| vcs_error("hg mv", &e.to_string()))?;
        self.removed.borrow_mut().insert(from.to_string());
        self.added.borrow_mut().insert(to.to_string());
        self.copies
            .borrow_mut()
            .insert(to.to_string(), from.to_string());
        Ok(())
    }

    fn revert(&self, paths: &[String]) -> MbResult<()> {
        for path in paths {
            self.revert_path(path)?;
        }
        Ok(())
    }

    fn revert_all(&self) -> MbResult<()> {
        let mut paths: BTreeSet<String> = self.tracked().into_keys().collect();
        paths.extend(self.added.borrow().iter().cloned());
        for (done, path) in paths.iter().enumerate() {
            if done > 0 && self.fail_revert.get() {
                return Err(vcs_error("hg revert", "abort: simulated failure"));
            }
            self.revert_path(path)?;
        }
        Ok(())
    }

    fn update(&self, branch: &str) -> MbResult<()> {
        if self.fail_update.get() {
            return Err(vcs_error("hg update", "abort: simulated failure"));
        }
        if !self.status_text().is_empty() {
            return Err(vcs_error("hg update", "abort: uncommitted changes"));
        }
        let Some(next) = self.committed.borrow().get(branch).cloned() else {
            return Err(vcs_error("hg update", "abort: unknown revision"));
        };
        for path in self.tracked().keys() {
            if !next.contains_key(path) {
                let _ = fs::remove_file(self.abs(path));
            }
        }
        for (path, bytes) in &next {
            write_file(&self.abs(path), bytes).map_err(|e| vcs_error("hg update", &e.to_string()))?;
        }
        *self.branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn changeset_for(&self, _branch: &str, path: &str) -> MbResult<Option<String>> {
        Ok(self.changesets.borrow().get(path).cloned())
    }

    fn commit(&self, paths: &[String], message: &str) -> MbResult<String> {
        if self.fail_commit.get() {
            return Err(vcs_error("hg commit", "abort: simulated failure"));
        }
        let branch = self.branch();
        for path in paths {
            let live = self.abs(path);
            let mut committed = self.committed.borrow_mut();
            let tree = committed.entry(branch.clone()).or_default();
            if self.removed.borrow_mut().remove(path) {
                tree.remove(path);
            } else {
                let bytes = fs::read(&live).map_err(|e| vcs_error("hg commit", &e.to_string()))?;
                tree.insert(path.clone(), bytes);
            }
            self.added.borrow_mut().remove(path);
            self.copies.borrow_mut().remove(path);
        }
        self.commits
            .borrow_mut()
            .push((paths.to_vec(), message.to_string()));
        Ok(String::new())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct Member {
    bytes: Vec<u8>,
    mtime: i64,
}

/// Archiver writing a JSON map of relative path to bytes and mtime.
#[derive(Default)]
pub struct JsonArchiver {
    pub fail_create: Cell<bool>,
    pub fail_extract_one: Cell<bool>,
}

impl JsonArchiver {
    pub fn members(&self, archive: &Path) -> Result<Vec<String>> {
        let map: BTreeMap<String, Member> = serde_json::from_slice(&fs::read(archive)?)?;
        Ok(map.into_keys().collect())
    }

    fn load(archive: &Path) -> MbResult<BTreeMap<String, Member>> {
        let bytes = fs::read(archive).map_err(MicrobranchError::io(archive))?;
        serde_json::from_slice(&bytes).map_err(|e| MicrobranchError::ArchiveError {
            detail: e.to_string(),
        })
    }

    fn unpack(dest: &Path, name: &str, member: &Member) -> MbResult<()> {
        let path = dest.join(name);
        write_file(&path, &member.bytes).map_err(|e| MicrobranchError::ArchiveError {
            detail: e.to_string(),
        })?;
        filetime::set_file_mtime(&path, FileTime::from_unix_time(member.mtime, 0))
            .map_err(MicrobranchError::io(&path))
    }
}

impl Archiver for JsonArchiver {
    fn extension(&self) -> &str {
        "json"
    }

    fn create(&self, archive: &Path, base: &Path, files: &[String]) -> MbResult<()> {
        if self.fail_create.get() {
            return Err(MicrobranchError::ArchiveError {
                detail: "simulated failure".into(),
            });
        }
        let mut map = BTreeMap::new();
        for file in files {
            for entry in WalkDir::new(base.join(file)) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(base) else {
                    continue;
                };
                let meta = entry.metadata().map_err(MicrobranchError::from)?;
                let member = Member {
                    bytes: fs::read(entry.path()).map_err(MicrobranchError::io(entry.path()))?,
                    mtime: FileTime::from_last_modification_time(&meta).unix_seconds(),
                };
                map.insert(rel.to_string_lossy().replace('\\', "/"), member);
            }
        }
        let json = serde_json::to_vec(&map).map_err(|e| MicrobranchError::ArchiveError {
            detail: e.to_string(),
        })?;
        fs::write(archive, json).map_err(MicrobranchError::io(archive))
    }

    fn extract_all(&self, archive: &Path, dest: &Path) -> MbResult<()> {
        for (name, member) in &Self::load(archive)? {
            Self::unpack(dest, name, member)?;
        }
        Ok(())
    }

    fn extract_one(&self, archive: &Path, dest: &Path, file: &str) -> MbResult<()> {
        if self.fail_extract_one.get() {
            return Err(MicrobranchError::ArchiveError {
                detail: "simulated failure".into(),
            });
        }
        let map = Self::load(archive)?;
        let member = map.get(file).ok_or_else(|| MicrobranchError::ArchiveError {
            detail: format!("{file} not in archive"),
        })?;
        Self::unpack(dest, file, member)
    }
}

/// Merge tool that optionally rewrites the shelved copy.
#[derive(Default)]
pub struct ScriptedMerge {
    pub result: Option<String>,
    pub calls: Cell<usize>,
}

impl ScriptedMerge {
    pub fn writing(result: &str) -> Self {
        Self {
            result: Some(result.to_string()),
            calls: Cell::new(0),
        }
    }
}

impl MergeTool for ScriptedMerge {
    fn merge(&self, shelved: &Path, _live: &Path) -> MbResult<()> {
        self.calls.set(self.calls.get() + 1);
        if let Some(text) = &self.result {
            fs::write(shelved, text).map_err(MicrobranchError::io(shelved))?;
        }
        Ok(())
    }
}

/// A working copy plus separate shelf and scratch directories.
pub struct Fixture {
    pub dir: TempDir,
    pub vcs: FakeVcs,
    pub archiver: JsonArchiver,
}

impl Fixture {
    pub fn new(branch: &str, files: &[(&str, &str)]) -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("wc");
        fs::create_dir_all(dir.path().join("shelves"))?;
        fs::create_dir_all(dir.path().join("scratch"))?;
        let vcs = FakeVcs::new(&root, branch, files)?;
        Ok(Self {
            dir,
            vcs,
            archiver: JsonArchiver::default(),
        })
    }

    pub fn shelf_root(&self) -> PathBuf {
        self.dir.path().join("shelves")
    }

    /// Context for the branch the fake is currently on.
    pub fn ctx(&self) -> WorkingCopyContext {
        WorkingCopyContext::new(&self.dir.path().join("wc"), &self.vcs.branch())
            .with_shelf_root(&self.shelf_root())
            .with_scratch_root(&self.dir.path().join("scratch"))
    }
}
