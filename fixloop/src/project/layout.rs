//! Project layout: where sources, headers, the manifest and generated files live.
//!
//! Every path is relative to the project root. Defaults reproduce the
//! phase-numbered embedded tree the tool was built for.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations and naming conventions inside a project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    /// Root source directory
    pub source_dir: PathBuf,
    /// Root include directory
    pub include_dir: PathBuf,
    /// Build manifest (makefile)
    pub manifest: PathBuf,
    /// Conventional sub-directories of `source_dir` searched for existing sources
    pub source_subdirs: Vec<String>,
    /// Most specific source-list label in the manifest
    pub primary_list: String,
    /// Fallback source-list label
    pub fallback_list: String,
    /// Entry-point file name whose definitions yield to module definitions
    pub entry_point: String,
    /// Consolidated stub file name, created under `source_dir`
    pub stub_file: String,
    /// Generated constants header
    pub constants_header: PathBuf,
    /// Prefix that marks an undeclared identifier as a project constant
    pub constant_prefix: String,
    /// Return type used for synthesized forward declarations
    pub forward_decl_type: String,
    /// Export bundle root
    pub export_dir: PathBuf,
    /// Phase numbers bundled on success
    pub export_phases: Vec<u32>,
    /// Files from `source_dir` copied into every phase bundle when present
    pub export_always: Vec<String>,
    /// Directory holding the linked images
    pub artifact_dir: PathBuf,
    /// File stem shared by the linked images
    pub artifact_stem: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            include_dir: PathBuf::from("include"),
            manifest: PathBuf::from("Makefile"),
            source_subdirs: vec!["phase1".into(), "phase2".into(), "common".into()],
            primary_list: "PHASE1_C_SOURCES".to_string(),
            fallback_list: "C_SOURCES".to_string(),
            entry_point: "main.c".to_string(),
            stub_file: "dsrtos_stubs.c".to_string(),
            constants_header: PathBuf::from("include/common/dsrtos_auto_constants.h"),
            constant_prefix: "DSRTOS_".to_string(),
            forward_decl_type: "dsrtos_result_t".to_string(),
            export_dir: PathBuf::from("exports"),
            export_phases: vec![1, 2],
            export_always: vec![
                "main.c".into(),
                "dsrtos_stubs.c".into(),
                "dsrtos_auto_stubs.c".into(),
            ],
            artifact_dir: PathBuf::from("build/bin"),
            artifact_stem: "dsrtos_debug".to_string(),
        }
    }
}

impl ProjectLayout {
    /// Path of a file directly under the source root
    pub fn source_path(&self, file_name: &str) -> PathBuf {
        self.source_dir.join(file_name)
    }

    /// Every location an existing source named `file_name` may occupy,
    /// root first, then the conventional sub-directories in order.
    pub fn candidate_sources(&self, file_name: &str) -> Vec<PathBuf> {
        std::iter::once(self.source_path(file_name))
            .chain(
                self.source_subdirs
                    .iter()
                    .map(|sub| self.source_dir.join(sub).join(file_name)),
            )
            .collect()
    }

    /// Path of the consolidated stub file
    pub fn stub_path(&self) -> PathBuf {
        self.source_path(&self.stub_file)
    }

    /// File name of the constants header, as used in `#include` directives
    pub fn constants_header_name(&self) -> String {
        self.constants_header
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "auto_constants.h".to_string())
    }

    /// `src/phase<N>`
    pub fn phase_source_dir(&self, phase: u32) -> PathBuf {
        self.source_dir.join(format!("phase{}", phase))
    }

    /// `include/phase<N>`
    pub fn phase_include_dir(&self, phase: u32) -> PathBuf {
        self.include_dir.join(format!("phase{}", phase))
    }

    /// `include/common`
    pub fn common_include_dir(&self) -> PathBuf {
        self.include_dir.join("common")
    }

    /// `exports/phase<N>`
    pub fn phase_export_dir(&self, phase: u32) -> PathBuf {
        self.export_dir.join(format!("phase{}", phase))
    }

    /// Linked images checked after a successful build, with display labels
    pub fn artifact_paths(&self) -> Vec<(&'static str, PathBuf)> {
        [("ELF Binary", "elf"), ("HEX File", "hex"), ("BIN File", "bin"), ("MAP File", "map")]
            .into_iter()
            .map(|(label, ext)| {
                (
                    label,
                    self.artifact_dir
                        .join(format!("{}.{}", self.artifact_stem, ext)),
                )
            })
            .collect()
    }

    /// Whether `path` is the designated entry-point file
    pub fn is_entry_point(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy() == self.entry_point.as_str())
            .unwrap_or(false)
    }
}

/// Render a tree-relative path the way a makefile references it
/// (forward slashes regardless of host platform).
pub fn manifest_reference(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_sources_order() {
        let layout = ProjectLayout::default();
        let candidates = layout.candidate_sources("uart.c");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("src/uart.c"),
                PathBuf::from("src/phase1/uart.c"),
                PathBuf::from("src/phase2/uart.c"),
                PathBuf::from("src/common/uart.c"),
            ]
        );
    }

    #[test]
    fn test_constants_header_name() {
        let layout = ProjectLayout::default();
        assert_eq!(layout.constants_header_name(), "dsrtos_auto_constants.h");
    }

    #[test]
    fn test_entry_point_matches_file_name_only() {
        let layout = ProjectLayout::default();
        assert!(layout.is_entry_point(Path::new("src/main.c")));
        assert!(!layout.is_entry_point(Path::new("src/domain.c")));
        assert!(!layout.is_entry_point(Path::new("src/main.c.bak")));
    }

    #[test]
    fn test_manifest_reference_uses_forward_slashes() {
        let path = PathBuf::from("src").join("phase1").join("boot.c");
        assert_eq!(manifest_reference(&path), "src/phase1/boot.c");
    }

    #[test]
    fn test_partial_layout_keeps_defaults() {
        let layout: ProjectLayout =
            serde_json::from_str(r#"{"entry_point": "app.c", "export_phases": [1, 2, 3]}"#)
                .unwrap();
        assert_eq!(layout.entry_point, "app.c");
        assert_eq!(layout.export_phases, vec![1, 2, 3]);
        assert_eq!(layout.primary_list, "PHASE1_C_SOURCES");
    }
}
