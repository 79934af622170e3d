//! Missing build rule → locate or create the source, then list it in the manifest.

use super::templates::SourceTemplate;
use super::{banner_date, CorrectiveAction, Synthesizer};
use crate::error::FixResult;
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Handles `No rule to make target 'X'`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildRuleSynthesizer;

/// Source file name the build expected for `target`.
///
/// `build/obj/uart.o` → `uart.c`; a `.c` target keeps its name. Targets that
/// are not object files or C sources (linked images, phony targets) yield
/// `None`.
pub fn source_name_for_target(target: &str) -> Option<String> {
    let name = Path::new(target).file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".o") {
        if stem.is_empty() {
            return None;
        }
        return Some(format!("{}.c", stem));
    }
    if name.len() > 2 && name.ends_with(".c") {
        return Some(name.to_string());
    }
    None
}

impl BuildRuleSynthesizer {
    /// Existing location of `file_name`, root first, then sub-directories
    fn locate(state: &ProjectState, file_name: &str) -> Option<PathBuf> {
        state
            .layout()
            .candidate_sources(file_name)
            .into_iter()
            .find(|p| state.exists(p))
    }
}

impl Synthesizer for BuildRuleSynthesizer {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::MissingBuildRule
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let mut created = Vec::new();
        let mut registered = Vec::new();

        for target in subjects {
            let Some(file_name) = source_name_for_target(target) else {
                tracing::debug!(target = %target, "Target is not a C source or object; skipping");
                continue;
            };

            let path = match Self::locate(state, &file_name) {
                Some(found) => {
                    tracing::debug!(path = %found.display(), "Found existing source");
                    found
                }
                None => {
                    let path = state.layout().source_path(&file_name);
                    let template = SourceTemplate::for_file(&file_name);
                    state.write(&path, &template.render(&file_name, &banner_date()))?;
                    tracing::info!(path = %path.display(), ?template, "Created missing source");
                    action.touch(&path);
                    created.push(file_name.clone());
                    path
                }
            };

            if state.register_source(&path)? {
                action.touch(&state.layout().manifest);
                registered.push(file_name);
            }
        }

        let description = match (created.is_empty(), registered.is_empty()) {
            (true, true) => "all targets already have listed sources".to_string(),
            _ => format!(
                "created [{}], registered [{}]",
                created.join(", "),
                registered.join(", ")
            ),
        };
        Ok(action.describe(description))
    }
}
