//! Undeclared project constant → generated constants header + includes.

use super::templates::include_guard;
use super::{symbol_pattern, CorrectiveAction, Synthesizer};
use crate::error::{FixError, FixResult};
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use std::collections::BTreeSet;

/// Handles `'PREFIX_X' undeclared` for uppercase project constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantsSynthesizer;

/// Value assigned to a synthesized constant, by name
pub fn constant_value(name: &str) -> &'static str {
    if name.contains("HEAP_SIZE") {
        "32768U"
    } else if name.contains("ERROR_HARDWARE") {
        "0x1000000BU"
    } else if name.contains("ERROR_FATAL") {
        "0x1000000AU"
    } else if name.contains("ERROR_") {
        "0x10000001U"
    } else {
        "0U"
    }
}

/// Header body defining every constant in `names`
pub fn render_constants_header(header_name: &str, names: &BTreeSet<String>) -> String {
    let guard = include_guard(header_name);
    let mut out = format!(
        "#ifndef {guard}\n#define {guard}\n\n/* Auto-generated missing constants */\n"
    );
    for name in names {
        out.push_str(&format!("#define {:<30} {}\n", name, constant_value(name)));
    }
    out.push_str(&format!("\n#endif /* {guard} */\n"));
    out
}

impl Synthesizer for ConstantsSynthesizer {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::UndeclaredConstant
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let header_path = state.layout().constants_header.clone();
        let header_name = state.layout().constants_header_name();
        let header = render_constants_header(&header_name, subjects);

        let current = match state.read(&header_path) {
            Ok(content) => Some(content),
            Err(FixError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        if current.as_deref() != Some(header.as_str()) {
            state.write(&header_path, &header)?;
            tracing::info!(path = %header_path.display(), count = subjects.len(), "Wrote constants header");
            action.touch(&header_path);
        }

        let references = subjects
            .iter()
            .map(|name| symbol_pattern(r"\b{sym}\b", name))
            .collect::<FixResult<Vec<_>>>()?;
        let include_line = format!("#include \"{}\"\n", header_name);

        let mut included = 0;
        for (path, content) in state.read_sources()? {
            if content.contains(&header_name) || !references.iter().any(|re| re.is_match(&content)) {
                continue;
            }
            state.write(&path, &format!("{}{}", include_line, content))?;
            tracing::debug!(path = %path.display(), "Included constants header");
            action.touch(&path);
            included += 1;
        }

        let description = if action.changed() {
            format!(
                "defined [{}], included header in {} file(s)",
                action.subjects.join(", "),
                included
            )
        } else {
            "constants header already current".to_string()
        };
        Ok(action.describe(description))
    }
}
