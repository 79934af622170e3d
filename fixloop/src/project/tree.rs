//! Source tree access. The on-disk implementation walks with the `ignore` crate
//!
//! Synthesizers never touch the filesystem directly; they go through
//! [`SourceTree`] so tests can swap in [`MemoryTree`](super::memory::MemoryTree).

use crate::error::{FixError, FixResult};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Read/write access to a project tree, addressed by root-relative paths.
pub trait SourceTree {
    /// Read a text file.
    fn read(&self, path: &Path) -> FixResult<String>;

    /// Write a text file, creating parent directories as needed.
    fn write(&mut self, path: &Path, contents: &str) -> FixResult<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Size in bytes of the file at `path`, if it exists.
    fn file_size(&self, path: &Path) -> Option<u64>;

    /// All files below `dir`, recursively, sorted. Empty when `dir` is absent.
    fn files_under(&self, dir: &Path) -> Vec<PathBuf>;

    /// Files directly inside `dir` (no recursion), sorted.
    fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.files_under(dir)
            .into_iter()
            .filter(|p| p.parent() == Some(dir))
            .collect()
    }

    /// Copy one file to another location.
    fn copy(&mut self, from: &Path, to: &Path) -> FixResult<()> {
        let contents = self.read(from)?;
        self.write(to, &contents)
    }
}

/// A project tree rooted at a directory on disk.
pub struct DiskTree {
    root: PathBuf,
}

impl DiskTree {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The directory all relative paths resolve against
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(&self, full: &Path) -> FixResult<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| FixError::io(parent, e))?;
        }
        Ok(())
    }
}

impl SourceTree for DiskTree {
    fn read(&self, path: &Path) -> FixResult<String> {
        let full = self.full(path);
        fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FixError::not_found(path),
            _ => FixError::io(path, e),
        })
    }

    fn write(&mut self, path: &Path, contents: &str) -> FixResult<()> {
        let full = self.full(path);
        self.ensure_parent(&full)?;
        fs::write(&full, contents).map_err(|e| FixError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        self.full(path).is_file()
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(self.full(path))
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        let base = self.full(dir);
        if !base.is_dir() {
            return Vec::new();
        }

        let walker = WalkBuilder::new(&base)
            .hidden(true) // skip editor swap files and dot-dirs
            .git_ignore(false)
            .ignore(false)
            .build();

        let mut files: Vec<PathBuf> = walker
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();

        files.sort();
        files
    }

    fn copy(&mut self, from: &Path, to: &Path) -> FixResult<()> {
        let dest = self.full(to);
        self.ensure_parent(&dest)?;
        fs::copy(self.full(from), &dest)
            .map(|_| ())
            .map_err(|e| FixError::io(from, e))
    }
}
