//! Undeclared file-scope symbol → `static` forward declaration.
//!
//! For each symbol, the first source file (sorted by path) that calls it and
//! lacks a declaration receives one, placed after its last `#include`.

use super::{symbol_pattern, CorrectiveAction, Synthesizer};
use crate::error::FixResult;
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use std::collections::BTreeSet;

/// Statement keywords that can precede a call on the same line
const CALL_PREFIX_KEYWORDS: &[&str] = &["return", "else", "do", "case", "goto"];

/// Handles `'X' undeclared here (not in a function)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardDeclSynthesizer;

/// Whether `content` calls `symbol` anywhere
fn has_call_site(content: &str, symbol: &str) -> FixResult<bool> {
    Ok(symbol_pattern(r"\b{sym}[ \t]*\(", symbol)?.is_match(content))
}

/// Whether `content` has a prototype line for `symbol`: a type prefix, the
/// name, a parameter list, then `;`.
fn has_declaration(content: &str, symbol: &str) -> FixResult<bool> {
    let re = symbol_pattern(
        r"(?m)^[ \t]*([A-Za-z_][\w \t\*]*?)\b{sym}[ \t]*\([^;{}\n]*\)[ \t]*;",
        symbol,
    )?;
    let found = re.captures_iter(content).any(|caps| {
        let first_word = caps
            .get(1)
            .and_then(|m| m.as_str().split_whitespace().next())
            .unwrap_or_default();
        !CALL_PREFIX_KEYWORDS.contains(&first_word)
    });
    Ok(found)
}

/// Byte offset just past the last `#include` line, or 0 without one
fn insertion_offset(content: &str) -> (usize, bool) {
    let mut offset = 0;
    let mut found = false;
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        pos += line.len();
        if line.trim_start().starts_with("#include") {
            offset = pos;
            found = true;
        }
    }
    (offset, found)
}

/// `content` with a forward declaration for `symbol` inserted
pub fn with_forward_declaration(content: &str, symbol: &str, decl_type: &str) -> String {
    let declaration = format!(
        "/* Forward declaration */\nstatic {} {}(void);\n",
        decl_type, symbol
    );
    let (offset, after_include) = insertion_offset(content);

    let mut updated = String::with_capacity(content.len() + declaration.len() + 2);
    updated.push_str(&content[..offset]);
    if after_include {
        if !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push('\n');
        updated.push_str(&declaration);
    } else {
        updated.push_str(&declaration);
        updated.push('\n');
    }
    updated.push_str(&content[offset..]);
    updated
}

impl Synthesizer for ForwardDeclSynthesizer {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::UndeclaredSymbol
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let decl_type = state.layout().forward_decl_type.clone();
        let mut declared = Vec::new();

        for symbol in subjects {
            for (path, content) in state.read_sources()? {
                if !has_call_site(&content, symbol)? || has_declaration(&content, symbol)? {
                    continue;
                }
                state.write(&path, &with_forward_declaration(&content, symbol, &decl_type))?;
                tracing::info!(symbol = %symbol, path = %path.display(), "Added forward declaration");
                action.touch(&path);
                declared.push(symbol.as_str());
                break;
            }
        }

        let description = if declared.is_empty() {
            "no file needed a forward declaration".to_string()
        } else {
            format!("declared [{}]", declared.join(", "))
        };
        Ok(action.describe(description))
    }
}
