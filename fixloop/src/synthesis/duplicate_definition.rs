//! Multiple definition → drop the entry point's copy.

use super::{symbol_pattern, CorrectiveAction, Synthesizer};
use crate::error::FixResult;
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;

/// Handles ``multiple definition of `X'``.
///
/// Entry-point definitions always yield to module definitions. Nothing is
/// removed unless some other source file also defines the symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDefinitionRemover;

/// A function signature for `symbol` up to and including its opening `{`
fn definition_head(symbol: &str) -> FixResult<Regex> {
    symbol_pattern(r"(?m)^[^/\n]*\b{sym}\s*\([^)]*\)\s*\{", symbol)
}

/// Byte offset just past the `}` matching the `{` at `open`. Braces inside
/// comments and string or character literals are not counted.
fn matching_brace(content: &str, open: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte ranges of every complete definition of the symbol `head` matches
fn definition_spans(head: &Regex, content: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(m) = head.find_at(content, from) {
        match matching_brace(content, m.end() - 1) {
            Some(end) => {
                spans.push(m.start()..end);
                from = end;
            }
            None => break,
        }
    }
    spans
}

/// `content` with each span replaced by `marker`
fn replace_spans(content: &str, spans: &[Range<usize>], marker: &str) -> String {
    let mut updated = String::with_capacity(content.len());
    let mut last = 0;
    for span in spans {
        updated.push_str(&content[last..span.start]);
        updated.push_str(marker);
        last = span.end;
    }
    updated.push_str(&content[last..]);
    updated
}

/// Marker left where a definition was removed
pub fn removal_marker(symbol: &str) -> String {
    format!("/* REMOVED: {} implemented elsewhere */", symbol)
}

impl Synthesizer for DuplicateDefinitionRemover {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::MultipleDefinition
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let mut removed = Vec::new();

        for symbol in subjects {
            let head = definition_head(symbol)?;
            let definers: Vec<_> = state
                .read_sources()?
                .into_iter()
                .filter_map(|(path, content)| {
                    let spans = definition_spans(&head, &content);
                    (!spans.is_empty()).then_some((path, content, spans))
                })
                .collect();

            let (entry, modules): (Vec<_>, Vec<_>) = definers
                .into_iter()
                .partition(|(path, _, _)| state.layout().is_entry_point(path));

            if modules.is_empty() {
                tracing::debug!(symbol = %symbol, "No module definition to keep; leaving entry point alone");
                continue;
            }

            for (path, content, spans) in entry {
                let updated = replace_spans(&content, &spans, &removal_marker(symbol));
                state.write(&path, &updated)?;
                tracing::info!(
                    symbol = %symbol,
                    path = %path.display(),
                    kept_in = %modules[0].0.display(),
                    "Removed duplicate definition"
                );
                action.touch(&path);
                removed.push(symbol.as_str());
            }
        }

        let description = if removed.is_empty() {
            "no entry-point duplicate to remove".to_string()
        } else {
            format!("removed entry-point definitions of [{}]", removed.join(", "))
        };
        Ok(action.describe(description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{MemoryTree, ProjectLayout};
    use std::path::Path;

    const MAIN: &str = "#include \"dsrtos_timer.h\"\n\nvoid dsrtos_timer_init(void)\n{\n    if (x) {\n        y();\n    }\n}\n\nint main(void)\n{\n    dsrtos_timer_init();\n    return 0;\n}\n";
    const TIMER: &str = "void dsrtos_timer_init(void)\n{\n    TIM2->CR1 = 1U;\n}\n";

    fn subjects(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entry_point_definition_removed() {
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file("src/main.c", MAIN)
                .with_file("src/phase1/dsrtos_timer.c", TIMER),
            ProjectLayout::default(),
        );
        let action = DuplicateDefinitionRemover
            .apply(&mut st, &subjects(&["dsrtos_timer_init"]))
            .unwrap();
        assert!(action.changed());

        let main = st.read(Path::new("src/main.c")).unwrap();
        assert!(main.contains("/* REMOVED: dsrtos_timer_init implemented elsewhere */"));
        // Nested braces stay inside the removed block; main() survives
        assert!(!main.contains("y();"));
        assert!(main.contains("int main(void)\n{\n    dsrtos_timer_init();"));
        assert_eq!(st.read(Path::new("src/phase1/dsrtos_timer.c")).unwrap(), TIMER);
    }

    #[test]
    fn test_one_line_entry_definition_leaves_main() {
        let main = "#include \"t.h\"\nvoid dsrtos_timer_init(void) { }\n\nint main(void)\n{ dsrtos_timer_init(); return 0;\n}\n";
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file("src/main.c", main)
                .with_file("src/phase1/dsrtos_timer.c", TIMER),
            ProjectLayout::default(),
        );
        DuplicateDefinitionRemover
            .apply(&mut st, &subjects(&["dsrtos_timer_init"]))
            .unwrap();

        assert_eq!(
            st.read(Path::new("src/main.c")).unwrap(),
            "#include \"t.h\"\n/* REMOVED: dsrtos_timer_init implemented elsewhere */\n\nint main(void)\n{ dsrtos_timer_init(); return 0;\n}\n"
        );
    }

    #[test]
    fn test_one_line_module_definition_is_found() {
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file("src/main.c", MAIN)
                .with_file("src/phase1/dsrtos_timer.c", "void dsrtos_timer_init(void) { TIM2->CR1 = 1U; }\n"),
            ProjectLayout::default(),
        );
        let action = DuplicateDefinitionRemover
            .apply(&mut st, &subjects(&["dsrtos_timer_init"]))
            .unwrap();
        assert!(action.changed());
        assert!(st
            .read(Path::new("src/main.c"))
            .unwrap()
            .contains("/* REMOVED: dsrtos_timer_init implemented elsewhere */"));
    }

    #[test]
    fn test_braces_in_literals_and_comments_ignored() {
        let content = "void f(void)\n{\n    puts(\"}\"); /* } */ // }\n    c = '}';\n}\nint main(void) { return 0; }\n";
        let head = definition_head("f").unwrap();
        let spans = definition_spans(&head, content);
        assert_eq!(spans.len(), 1);
        assert!(content[spans[0].clone()].ends_with("c = '}';\n}"));
    }

    #[test]
    fn test_unbalanced_body_is_not_a_definition() {
        let head = definition_head("f").unwrap();
        assert!(definition_spans(&head, "void f(void)\n{\n    if (x) {\n").is_empty());
    }

    #[test]
    fn test_sole_definition_kept() {
        let mut st = ProjectState::new(
            MemoryTree::new().with_file("src/main.c", MAIN),
            ProjectLayout::default(),
        );
        let action = DuplicateDefinitionRemover
            .apply(&mut st, &subjects(&["dsrtos_timer_init"]))
            .unwrap();
        assert!(!action.changed());
        assert_eq!(st.read(Path::new("src/main.c")).unwrap(), MAIN);
    }

    #[test]
    fn test_module_duplicates_left_alone() {
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file("src/phase1/a.c", TIMER)
                .with_file("src/phase2/b.c", TIMER),
            ProjectLayout::default(),
        );
        let action = DuplicateDefinitionRemover
            .apply(&mut st, &subjects(&["dsrtos_timer_init"]))
            .unwrap();
        assert!(!action.changed());
    }

    #[test]
    fn test_second_application_is_noop() {
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file("src/main.c", MAIN)
                .with_file("src/phase1/dsrtos_timer.c", TIMER),
            ProjectLayout::default(),
        );
        let targets = subjects(&["dsrtos_timer_init"]);
        DuplicateDefinitionRemover.apply(&mut st, &targets).unwrap();
        let after_first = st.read(Path::new("src/main.c")).unwrap();

        assert!(!DuplicateDefinitionRemover.apply(&mut st, &targets).unwrap().changed());
        assert_eq!(st.read(Path::new("src/main.c")).unwrap(), after_first);
    }
}
