//! In-memory source tree for tests and dry runs.

use super::tree::SourceTree;
use crate::error::{FixError, FixResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A project tree held entirely in a map of path → contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Number of files held
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceTree for MemoryTree {
    fn read(&self, path: &Path) -> FixResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FixError::not_found(path))
    }

    fn write(&mut self, path: &Path, contents: &str) -> FixResult<()> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        self.files.get(path).map(|c| c.len() as u64)
    }

    fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        // BTreeMap iteration is already sorted
        self.files
            .keys()
            .filter(|p| p.starts_with(dir) && p.as_path() != dir)
            .cloned()
            .collect()
    }
}
