//! Project State Module
//!
//! The mutable source tree + build manifest that every corrective action
//! reads and writes. One owned [`ProjectState`] is threaded through the
//! convergence loop; nothing else holds a handle to the tree.
//!
//! # Architecture
//!
//! ```text
//! ProjectState ──owns──> Box<dyn SourceTree>  (DiskTree | MemoryTree)
//!              └──────> ProjectLayout         (where things live)
//! ```

pub mod layout;
pub mod manifest;
pub mod memory;
pub mod tree;

pub use layout::{manifest_reference, ProjectLayout};
pub use manifest::{reference_count, register_source, Registration};
pub use memory::MemoryTree;
pub use tree::{DiskTree, SourceTree};

use crate::error::{FixError, FixResult};
use std::path::{Path, PathBuf};

/// The project being repaired.
pub struct ProjectState {
    tree: Box<dyn SourceTree>,
    layout: ProjectLayout,
}

impl ProjectState {
    /// Wrap any tree implementation
    pub fn new(tree: impl SourceTree + 'static, layout: ProjectLayout) -> Self {
        Self {
            tree: Box::new(tree),
            layout,
        }
    }

    /// Project rooted at a directory on disk
    pub fn on_disk(root: impl AsRef<Path>, layout: ProjectLayout) -> Self {
        Self::new(DiskTree::new(root), layout)
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn tree(&self) -> &dyn SourceTree {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> &mut dyn SourceTree {
        self.tree.as_mut()
    }

    /// Read a file from the tree
    pub fn read(&self, path: &Path) -> FixResult<String> {
        self.tree.read(path)
    }

    /// Write a file to the tree
    pub fn write(&mut self, path: &Path, contents: &str) -> FixResult<()> {
        self.tree.write(path, contents)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.tree.exists(path)
    }

    /// All `.c` files under the source root, sorted
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.tree
            .files_under(&self.layout.source_dir)
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("c"))
            .collect()
    }

    /// Source files paired with their contents.
    ///
    /// Files that are not valid UTF-8 are skipped with a warning; any other
    /// read failure propagates.
    pub fn read_sources(&self) -> FixResult<Vec<(PathBuf, String)>> {
        let mut sources = Vec::new();
        for path in self.source_files() {
            match self.tree.read(&path) {
                Ok(contents) => sources.push((path, contents)),
                Err(e) if e.is_undecodable() => {
                    tracing::warn!(path = %path.display(), "Skipping undecodable source file");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sources)
    }

    /// Ensure `path` is listed in the manifest. Returns whether the manifest changed.
    pub fn register_source(&mut self, path: &Path) -> FixResult<bool> {
        let manifest_path = self.layout.manifest.clone();
        let manifest = match self.tree.read(&manifest_path) {
            Ok(m) => m,
            Err(FixError::NotFound { .. }) => {
                return Err(FixError::manifest_not_found(manifest_path))
            }
            Err(e) => return Err(e),
        };

        let reference = manifest_reference(path);
        let registration = register_source(
            &manifest,
            &reference,
            &self.layout.primary_list,
            &self.layout.fallback_list,
        )?;

        match &registration {
            Registration::AlreadyListed => {
                tracing::debug!(source = %reference, "Already listed in manifest");
                Ok(false)
            }
            Registration::Inserted { label, manifest } | Registration::Appended { label, manifest } => {
                self.tree.write(&manifest_path, manifest)?;
                tracing::info!(source = %reference, list = %label, "Added {} to manifest", reference);
                Ok(true)
            }
        }
    }
}

impl std::fmt::Debug for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectState")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
