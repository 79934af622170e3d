//! Snapshot before the first round, export bundle after success.
//!
//! Both work through the [`SourceTree`](crate::project::SourceTree) so they
//! run unchanged against the in-memory tree in tests.

use crate::error::FixResult;
use crate::project::ProjectState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the pre-loop snapshot captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// `backup_<YYYYmmdd_HHMMSS>`
    pub prefix: String,
    /// Snapshot locations actually written (`<prefix>_src`, `_include`, `_Makefile`)
    pub locations: Vec<PathBuf>,
    /// Number of files copied
    pub files: usize,
}

/// Files placed in one phase bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseExport {
    pub phase: u32,
    pub dir: PathBuf,
    /// Files present in the bundle directory after export
    pub files: usize,
}

/// Result of exporting every configured phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub phases: Vec<PhaseExport>,
}

impl std::fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .phases
            .iter()
            .map(|p| format!("phase{}({} files)", p.phase, p.files))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// A linked image found (or not) after a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Display label, e.g. "ELF Binary"
    pub label: String,
    pub path: PathBuf,
    /// Size in bytes when present
    pub size: Option<u64>,
}

/// Snapshot prefix for the current local time
pub fn snapshot_prefix() -> String {
    chrono::Local::now()
        .format("backup_%Y%m%d_%H%M%S")
        .to_string()
}

/// Copy the source root, include root and manifest aside under `prefix`.
///
/// Locations that do not exist are skipped. Copies are never read back by
/// the loop.
pub fn create_snapshot(state: &mut ProjectState, prefix: &str) -> FixResult<SnapshotInfo> {
    let layout = state.layout().clone();
    let mut info = SnapshotInfo {
        prefix: prefix.to_string(),
        locations: Vec::new(),
        files: 0,
    };

    for (dir, suffix) in [(&layout.source_dir, "src"), (&layout.include_dir, "include")] {
        let files = state.tree().files_under(dir);
        if files.is_empty() {
            continue;
        }
        let dest_root = PathBuf::from(format!("{}_{}", prefix, suffix));
        for file in &files {
            let relative = file.strip_prefix(dir).unwrap_or(file);
            state.tree_mut().copy(file, &dest_root.join(relative))?;
        }
        info.files += files.len();
        info.locations.push(dest_root);
    }

    if state.exists(&layout.manifest) {
        let manifest_name = layout
            .manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Makefile".to_string());
        let dest = PathBuf::from(format!("{}_{}", prefix, manifest_name));
        state.tree_mut().copy(&layout.manifest, &dest)?;
        info.files += 1;
        info.locations.push(dest);
    }

    tracing::info!(prefix = %prefix, files = info.files, "Backup created: {}_*", prefix);
    Ok(info)
}

/// Copy `file` into `dest_dir` under its own file name
fn copy_flat(state: &mut ProjectState, file: &Path, dest_dir: &Path) -> FixResult<()> {
    let Some(name) = file.file_name() else {
        return Ok(());
    };
    state.tree_mut().copy(file, &dest_dir.join(name))
}

/// Populate `exports/phase<N>/` for every configured phase.
///
/// Each bundle gets the direct files of `src/phase<N>`, `include/phase<N>`
/// and `include/common`, plus the always-exported files from the source root.
pub fn export_bundle(state: &mut ProjectState) -> FixResult<ExportSummary> {
    let layout = state.layout().clone();
    let mut summary = ExportSummary::default();

    for &phase in &layout.export_phases {
        let dest = layout.phase_export_dir(phase);
        let mut sources = Vec::new();
        for dir in [
            layout.phase_source_dir(phase),
            layout.phase_include_dir(phase),
            layout.common_include_dir(),
        ] {
            sources.extend(state.tree().files_in(&dir));
        }
        sources.extend(
            layout
                .export_always
                .iter()
                .map(|name| layout.source_path(name))
                .filter(|p| state.exists(p)),
        );

        for file in &sources {
            copy_flat(state, file, &dest)?;
        }

        let files = state.tree().files_in(&dest).len();
        tracing::debug!(phase, files, dir = %dest.display(), "Exported phase bundle");
        summary.phases.push(PhaseExport {
            phase,
            dir: dest,
            files,
        });
    }

    tracing::info!("Exports created: {}", summary);
    Ok(summary)
}

/// Size of each expected linked image, `None` when absent
pub fn inspect_artifacts(state: &ProjectState) -> Vec<ArtifactReport> {
    state
        .layout()
        .artifact_paths()
        .into_iter()
        .map(|(label, path)| ArtifactReport {
            label: label.to_string(),
            size: state.tree().file_size(&path),
            path,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{MemoryTree, ProjectLayout};

    fn project() -> ProjectState {
        ProjectState::new(
            MemoryTree::new()
                .with_file("Makefile", "C_SOURCES = \\\n    src/main.c\n")
                .with_file("src/main.c", "int main(void) { return 0; }\n")
                .with_file("src/dsrtos_stubs.c", "/* stubs */\n")
                .with_file("src/phase1/boot.c", "void boot(void) {}\n")
                .with_file("src/phase1/drivers/uart.c", "void uart(void) {}\n")
                .with_file("src/phase2/sched.c", "void sched(void) {}\n")
                .with_file("include/phase1/boot.h", "#pragma once\n")
                .with_file("include/common/types.h", "#pragma once\n")
                .with_file("build/bin/dsrtos_debug.elf", "ELF-IMAGE"),
            ProjectLayout::default(),
        )
    }

    #[test]
    fn test_snapshot_copies_all_three_locations() {
        let mut st = project();
        let info = create_snapshot(&mut st, "backup_20260101_120000").unwrap();

        assert_eq!(
            info.locations,
            vec![
                PathBuf::from("backup_20260101_120000_src"),
                PathBuf::from("backup_20260101_120000_include"),
                PathBuf::from("backup_20260101_120000_Makefile"),
            ]
        );
        assert_eq!(info.files, 8);
        assert_eq!(
            st.read(Path::new("backup_20260101_120000_src/phase1/drivers/uart.c"))
                .unwrap(),
            "void uart(void) {}\n"
        );
        assert!(st.exists(Path::new("backup_20260101_120000_Makefile")));
    }

    #[test]
    fn test_snapshot_skips_missing_locations() {
        let mut st = ProjectState::new(
            MemoryTree::new().with_file("src/main.c", ""),
            ProjectLayout::default(),
        );
        let info = create_snapshot(&mut st, "backup_x").unwrap();
        assert_eq!(info.locations, vec![PathBuf::from("backup_x_src")]);
    }

    #[test]
    fn test_snapshot_prefix_format() {
        let prefix = snapshot_prefix();
        assert!(prefix.starts_with("backup_"));
        assert_eq!(prefix.len(), "backup_20260101_120000".len());
    }

    #[test]
    fn test_export_flattens_phase_files() {
        let mut st = project();
        let summary = export_bundle(&mut st).unwrap();

        // phase1: boot.c, boot.h, types.h, main.c, dsrtos_stubs.c
        assert_eq!(summary.phases[0].files, 5);
        // phase2: sched.c, types.h, main.c, dsrtos_stubs.c
        assert_eq!(summary.phases[1].files, 4);
        assert!(st.exists(Path::new("exports/phase1/boot.h")));
        assert!(st.exists(Path::new("exports/phase2/types.h")));
        // Nested directories are not bundled
        assert!(!st.exists(Path::new("exports/phase1/uart.c")));
        assert_eq!(summary.to_string(), "phase1(5 files), phase2(4 files)");
    }

    #[test]
    fn test_inspect_artifacts() {
        let st = project();
        let reports = inspect_artifacts(&st);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].label, "ELF Binary");
        assert_eq!(reports[0].size, Some(9));
        assert!(reports[1..].iter().all(|r| r.size.is_none()));
    }
}
