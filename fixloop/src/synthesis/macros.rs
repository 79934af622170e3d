//! Macro redefinition → delete the `#define` from plain source files.
//!
//! Headers keep their definitions; the copy in a `.c` file is the one that
//! goes.

use super::{symbol_pattern, CorrectiveAction, Synthesizer};
use crate::error::FixResult;
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use regex::Regex;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct MacroDeduplicator;

/// A whole `#define NAME ...` directive with any backslash-continued lines,
/// trailing newline included
fn define_directive(name: &str) -> FixResult<Regex> {
    symbol_pattern(
        r"(?m)^[ \t]*#[ \t]*define[ \t]+{sym}\b(?:.*\\\r?\n)*.*(?:\r?\n)?",
        name,
    )
}

impl Synthesizer for MacroDeduplicator {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::MacroRedefinition
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let patterns = subjects
            .iter()
            .map(|name| define_directive(name))
            .collect::<FixResult<Vec<_>>>()?;

        for (path, content) in state.read_sources()? {
            let mut updated = content.clone();
            for re in &patterns {
                updated = re.replace_all(&updated, "").into_owned();
            }
            if updated != content {
                state.write(&path, &updated)?;
                tracing::debug!(path = %path.display(), "Removed duplicate macro definitions");
                action.touch(&path);
            }
        }

        let description = if action.changed() {
            format!(
                "removed [{}] from {} source file(s)",
                action.subjects.join(", "),
                action.affected.len()
            )
        } else {
            "no source file redefines these macros".to_string()
        };
        Ok(action.describe(description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{MemoryTree, ProjectLayout};
    use std::path::Path;

    fn subjects(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_removes_define_from_sources_only() {
        let mut st = ProjectState::new(
            MemoryTree::new()
                .with_file(
                    "src/phase2/sched.c",
                    "#include \"cfg.h\"\n#define DSRTOS_MAX_TASKS 8U\n#define DSRTOS_MAX_TASKS_LIMIT 16U\nint x;\n",
                )
                .with_file("src/phase2/sched.h", "#define DSRTOS_MAX_TASKS 8U\n")
                .with_file("include/common/cfg.h", "#define DSRTOS_MAX_TASKS 32U\n"),
            ProjectLayout::default(),
        );
        let action = MacroDeduplicator
            .apply(&mut st, &subjects(&["DSRTOS_MAX_TASKS"]))
            .unwrap();
        assert_eq!(action.affected.len(), 1);

        assert_eq!(
            st.read(Path::new("src/phase2/sched.c")).unwrap(),
            "#include \"cfg.h\"\n#define DSRTOS_MAX_TASKS_LIMIT 16U\nint x;\n"
        );
        assert_eq!(
            st.read(Path::new("src/phase2/sched.h")).unwrap(),
            "#define DSRTOS_MAX_TASKS 8U\n"
        );
        assert_eq!(
            st.read(Path::new("include/common/cfg.h")).unwrap(),
            "#define DSRTOS_MAX_TASKS 32U\n"
        );
    }

    #[test]
    fn test_function_like_and_indented_defines() {
        let mut st = ProjectState::new(
            MemoryTree::new().with_file("src/a.c", "  #  define MIN(a, b) ((a) < (b) ? (a) : (b))\nint y;"),
            ProjectLayout::default(),
        );
        MacroDeduplicator.apply(&mut st, &subjects(&["MIN"])).unwrap();
        assert_eq!(st.read(Path::new("src/a.c")).unwrap(), "int y;");
    }

    #[test]
    fn test_continued_define_removed_whole() {
        let mut st = ProjectState::new(
            MemoryTree::new().with_file(
                "src/a.c",
                "#define DSRTOS_ASSERT(x) \\\n    do { \\\n        if (!(x)) { panic(); } \\\n    } while (0)\nint y;\n",
            ),
            ProjectLayout::default(),
        );
        MacroDeduplicator.apply(&mut st, &subjects(&["DSRTOS_ASSERT"])).unwrap();
        assert_eq!(st.read(Path::new("src/a.c")).unwrap(), "int y;\n");
    }

    #[test]
    fn test_second_application_is_noop() {
        let mut st = ProjectState::new(
            MemoryTree::new().with_file("src/a.c", "#define FOO 1\nint z;\n"),
            ProjectLayout::default(),
        );
        let targets = subjects(&["FOO"]);
        assert!(MacroDeduplicator.apply(&mut st, &targets).unwrap().changed());
        assert!(!MacroDeduplicator.apply(&mut st, &targets).unwrap().changed());
    }
}
