//! Corrective Action Synthesis Module
//!
//! One synthesizer per diagnostic kind. Each receives the full deduplicated
//! subject set of its kind for the round, checks the current tree before
//! writing, and reports what (if anything) it changed.
//!
//! # Architecture
//!
//! ```text
//! DiagnosticSet ──> SynthesizerSet ──┬─> BuildRuleSynthesizer       (missing build rule)
//!                                    ├─> ForwardDeclSynthesizer     (undeclared symbol)
//!                                    ├─> DuplicateDefinitionRemover (multiple definition)
//!                                    ├─> StubSynthesizer            (undefined reference)
//!                                    ├─> ConstantsSynthesizer       (undeclared constant)
//!                                    └─> MacroDeduplicator          (macro redefinition)
//!                                              │
//!                                              ▼
//!                                   ProjectState (tree + manifest)
//! ```

pub mod build_rule;
pub mod constants;
pub mod duplicate_definition;
pub mod forward_decl;
pub mod macros;
pub mod stubs;
pub mod templates;

pub use build_rule::BuildRuleSynthesizer;
pub use constants::{constant_value, ConstantsSynthesizer};
pub use duplicate_definition::DuplicateDefinitionRemover;
pub use forward_decl::ForwardDeclSynthesizer;
pub use macros::MacroDeduplicator;
pub use stubs::{StubKind, StubSynthesizer};
pub use templates::SourceTemplate;

use crate::error::{FixError, FixResult};
use crate::feedback::classifier::{DiagnosticKind, DiagnosticSet};
use crate::project::ProjectState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Summary of one synthesizer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    /// Diagnostic kind this action targets
    pub kind: DiagnosticKind,
    /// Subjects handed to the synthesizer
    pub subjects: Vec<String>,
    /// Files written, in write order, without repeats
    pub affected: Vec<PathBuf>,
    /// One-line description for the round report
    pub description: String,
}

impl CorrectiveAction {
    pub fn new(kind: DiagnosticKind, subjects: &BTreeSet<String>) -> Self {
        Self {
            kind,
            subjects: subjects.iter().cloned().collect(),
            affected: Vec::new(),
            description: String::new(),
        }
    }

    /// Record a written file
    pub fn touch(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.affected.contains(&path) {
            self.affected.push(path);
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether anything was written
    pub fn changed(&self) -> bool {
        !self.affected.is_empty()
    }
}

/// Turns a set of same-kind diagnostics into a mutation of the project.
pub trait Synthesizer {
    /// The diagnostic kind handled
    fn kind(&self) -> DiagnosticKind;

    /// Apply the correction. Must be a no-op when the tree already satisfies
    /// the correction for every subject.
    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction>;
}

/// Registry dispatching each diagnostic kind to its synthesizer
pub struct SynthesizerSet {
    synthesizers: BTreeMap<DiagnosticKind, Box<dyn Synthesizer>>,
}

impl Default for SynthesizerSet {
    fn default() -> Self {
        Self::empty()
            .with(BuildRuleSynthesizer)
            .with(ForwardDeclSynthesizer)
            .with(DuplicateDefinitionRemover)
            .with(StubSynthesizer)
            .with(ConstantsSynthesizer)
            .with(MacroDeduplicator)
    }
}

impl SynthesizerSet {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            synthesizers: BTreeMap::new(),
        }
    }

    /// Register (or replace) the synthesizer for its kind
    pub fn with(mut self, synthesizer: impl Synthesizer + 'static) -> Self {
        self.synthesizers
            .insert(synthesizer.kind(), Box::new(synthesizer));
        self
    }

    pub fn get(&self, kind: DiagnosticKind) -> Option<&dyn Synthesizer> {
        self.synthesizers.get(&kind).map(|s| s.as_ref())
    }

    /// Kinds with a registered synthesizer
    pub fn kinds(&self) -> impl Iterator<Item = DiagnosticKind> + '_ {
        self.synthesizers.keys().copied()
    }

    /// Run the synthesizer of every kind present, in kind order.
    ///
    /// Kinds without a registered synthesizer are skipped.
    pub fn apply_all(
        &self,
        state: &mut ProjectState,
        diagnostics: &DiagnosticSet,
    ) -> FixResult<Vec<CorrectiveAction>> {
        let mut actions = Vec::new();
        for (kind, subjects) in diagnostics.iter() {
            let Some(synthesizer) = self.get(kind) else {
                tracing::warn!(%kind, "No synthesizer registered");
                continue;
            };
            let action = synthesizer.apply(state, subjects)?;
            if action.changed() {
                tracing::info!(%kind, files = action.affected.len(), "{}", action.description);
            } else {
                tracing::debug!(%kind, "Nothing to change: {}", action.description);
            }
            actions.push(action);
        }
        Ok(actions)
    }
}

impl std::fmt::Debug for SynthesizerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizerSet")
            .field("kinds", &self.synthesizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Compile a per-symbol pattern; `{sym}` in `template` is replaced with the
/// escaped symbol.
pub(crate) fn symbol_pattern(template: &str, symbol: &str) -> FixResult<Regex> {
    let pattern = template.replace("{sym}", &regex::escape(symbol));
    Regex::new(&pattern).map_err(|e| FixError::pattern(symbol, e))
}

/// Today's date for generated file banners
pub(crate) fn banner_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
