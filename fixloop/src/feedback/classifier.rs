//! Build output classification
//!
//! Turns raw make/gcc/ld text into typed diagnostics. Each kind has exactly
//! one extraction rule and the rules run independently, so a single output
//! blob can yield several kinds at once. Lines that match nothing are ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

// Quote classes accept both ASCII and the typographic quotes newer gcc emits.

static MISSING_RULE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"No rule to make target [`'‘]([^'’`\n]+)['’]").unwrap()
});

static UNDECLARED_FILE_SCOPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[`'‘]([^'’`\s]+)['’] undeclared here \(not in a function\)").unwrap()
});

static MULTIPLE_DEFINITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"multiple definition of [`'‘]([^'’`\s]+)['’]").unwrap()
});

static UNDEFINED_REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"undefined reference to [`'‘]([^'’`\s]+)['’]").unwrap()
});

static UNDECLARED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[`'‘]([^'’`\s]+)['’] undeclared").unwrap());

static REDEFINED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“]([^"”\s]+)["”] redefined"#).unwrap());

static MEMORY_ROW_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Za-z0-9_]+:\s+\d+").unwrap());

/// Markers that make an output line worth showing to the operator
const ERROR_MARKERS: &[&str] = &[
    "error:",
    "undefined reference",
    "multiple definition",
    "No rule to make",
];

/// The closed set of diagnostic classes the loop knows how to correct.
///
/// Declaration order is the order corrective actions run within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `No rule to make target 'X'`
    MissingBuildRule,
    /// `'X' undeclared here (not in a function)`
    UndeclaredSymbol,
    /// ``multiple definition of `X'``
    MultipleDefinition,
    /// ``undefined reference to `X'``
    UndefinedReference,
    /// `'PREFIX_X' undeclared` for uppercase project constants
    UndeclaredConstant,
    /// `"X" redefined`
    MacroRedefinition,
}

impl DiagnosticKind {
    /// Every kind, in correction order
    pub const ALL: [DiagnosticKind; 6] = [
        Self::MissingBuildRule,
        Self::UndeclaredSymbol,
        Self::MultipleDefinition,
        Self::UndefinedReference,
        Self::UndeclaredConstant,
        Self::MacroRedefinition,
    ];

    /// Human-readable description for logs
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MissingBuildRule => "missing build rule",
            Self::UndeclaredSymbol => "undeclared file-scope symbol",
            Self::MultipleDefinition => "multiple definition",
            Self::UndefinedReference => "undefined reference",
            Self::UndeclaredConstant => "undeclared project constant",
            Self::MacroRedefinition => "macro redefinition",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBuildRule => write!(f, "missing_build_rule"),
            Self::UndeclaredSymbol => write!(f, "undeclared_symbol"),
            Self::MultipleDefinition => write!(f, "multiple_definition"),
            Self::UndefinedReference => write!(f, "undefined_reference"),
            Self::UndeclaredConstant => write!(f, "undeclared_constant"),
            Self::MacroRedefinition => write!(f, "macro_redefinition"),
        }
    }
}

/// One extracted diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic class
    pub kind: DiagnosticKind,
    /// Symbol name, target path, constant or macro name
    pub subject: String,
    /// The text the extraction rule matched
    pub raw: String,
}

/// Diagnostics of one round, grouped by kind with deduplicated subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSet {
    by_kind: BTreeMap<DiagnosticKind, BTreeSet<String>>,
}

impl DiagnosticSet {
    pub fn from_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        let mut by_kind: BTreeMap<DiagnosticKind, BTreeSet<String>> = BTreeMap::new();
        for diag in diagnostics {
            by_kind
                .entry(diag.kind)
                .or_default()
                .insert(diag.subject.clone());
        }
        Self { by_kind }
    }

    /// Kinds present, in correction order
    pub fn kinds(&self) -> impl Iterator<Item = DiagnosticKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// Subjects for a kind, if present
    pub fn subjects(&self, kind: DiagnosticKind) -> Option<&BTreeSet<String>> {
        self.by_kind.get(&kind)
    }

    /// Iterate kind → subjects in correction order
    pub fn iter(&self) -> impl Iterator<Item = (DiagnosticKind, &BTreeSet<String>)> {
        self.by_kind.iter().map(|(k, v)| (*k, v))
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Number of distinct kinds present
    pub fn kind_count(&self) -> usize {
        self.by_kind.len()
    }

    /// Number of distinct (kind, subject) pairs
    pub fn subject_count(&self) -> usize {
        self.by_kind.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

/// Classifier for make/gcc/ld output
#[derive(Debug, Clone)]
pub struct DiagnosticClassifier {
    /// Prefix identifying project constants (e.g. `DSRTOS_`)
    constant_prefix: String,
}

impl Default for DiagnosticClassifier {
    fn default() -> Self {
        Self::new("DSRTOS_")
    }
}

impl DiagnosticClassifier {
    pub fn new(constant_prefix: impl Into<String>) -> Self {
        Self {
            constant_prefix: constant_prefix.into(),
        }
    }

    /// Extract every diagnostic from `output`, grouped by kind in correction
    /// order and in textual order within a kind.
    pub fn classify(&self, output: &str) -> Vec<Diagnostic> {
        DiagnosticKind::ALL
            .iter()
            .flat_map(|kind| self.extract(*kind, output))
            .collect()
    }

    /// Classify and group in one step
    pub fn classify_set(&self, output: &str) -> DiagnosticSet {
        DiagnosticSet::from_diagnostics(&self.classify(output))
    }

    /// Apply the extraction rule of a single kind
    pub fn extract(&self, kind: DiagnosticKind, output: &str) -> Vec<Diagnostic> {
        let pattern: &Regex = match kind {
            DiagnosticKind::MissingBuildRule => &*MISSING_RULE_PATTERN,
            DiagnosticKind::UndeclaredSymbol => &*UNDECLARED_FILE_SCOPE_PATTERN,
            DiagnosticKind::MultipleDefinition => &*MULTIPLE_DEFINITION_PATTERN,
            DiagnosticKind::UndefinedReference => &*UNDEFINED_REFERENCE_PATTERN,
            DiagnosticKind::UndeclaredConstant => &*UNDECLARED_PATTERN,
            DiagnosticKind::MacroRedefinition => &*REDEFINED_PATTERN,
        };

        pattern
            .captures_iter(output)
            .filter_map(|caps| {
                let raw = caps.get(0)?.as_str().to_string();
                let subject = caps.get(1)?.as_str().trim().to_string();
                if subject.is_empty() {
                    return None;
                }
                if kind == DiagnosticKind::UndeclaredConstant && !self.is_project_constant(&subject) {
                    return None;
                }
                Some(Diagnostic { kind, subject, raw })
            })
            .collect()
    }

    /// Uppercase identifier carrying the project prefix
    pub fn is_project_constant(&self, ident: &str) -> bool {
        ident.starts_with(&self.constant_prefix)
            && ident.chars().any(char::is_alphabetic)
            && !ident.chars().any(char::is_lowercase)
    }

    /// First `limit` lines that look like errors, for operator display
    pub fn error_excerpt(output: &str, limit: usize) -> Vec<String> {
        output
            .lines()
            .filter(|line| ERROR_MARKERS.iter().any(|m| line.contains(m)))
            .take(limit)
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    /// The linker's memory-usage table (header plus region rows), if printed
    pub fn memory_usage(output: &str) -> Vec<String> {
        let mut lines = output.lines();
        let Some(header) = lines.find(|l| l.trim_start().starts_with("Memory region")) else {
            return Vec::new();
        };

        std::iter::once(header)
            .chain(lines.take_while(|l| MEMORY_ROW_PATTERN.is_match(l)))
            .map(|l| l.trim_end().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCC_OUTPUT: &str = r#"
arm-none-eabi-gcc -c src/phase1/dsrtos_boot.c -o build/obj/dsrtos_boot.o
src/phase1/dsrtos_boot.c:42:5: error: 'dsrtos_clock_init' undeclared here (not in a function)
src/phase1/dsrtos_boot.c:57:12: error: 'DSRTOS_ERROR_FATAL' undeclared (first use in this function)
src/phase1/dsrtos_boot.c:60:12: error: 'local_tmp' undeclared (first use in this function)
src/phase2/dsrtos_panic.c:12: warning: "DSRTOS_MAX_TASKS" redefined
make: *** No rule to make target 'build/obj/dsrtos_missing.o', needed by 'build/bin/dsrtos_debug.elf'.  Stop.
/usr/bin/ld: build/obj/main.o: in function `main':
main.c:(.text+0x1c): undefined reference to `dsrtos_memory_init'
main.c:(.text+0x2c): undefined reference to `dsrtos_memory_init'
/usr/bin/ld: build/obj/dsrtos_timer.o: multiple definition of `dsrtos_timer_init'; build/obj/main.o:main.c:(.text+0x0): first defined here
"#;

    #[test]
    fn test_classify_all_kinds() {
        let set = DiagnosticClassifier::default().classify_set(GCC_OUTPUT);
        assert_eq!(set.kind_count(), 6);

        let one = |kind| {
            set.subjects(kind)
                .unwrap()
                .iter()
                .cloned()
                .collect::<Vec<_>>()
        };
        assert_eq!(one(DiagnosticKind::MissingBuildRule), vec!["build/obj/dsrtos_missing.o"]);
        assert_eq!(one(DiagnosticKind::UndeclaredSymbol), vec!["dsrtos_clock_init"]);
        assert_eq!(one(DiagnosticKind::MultipleDefinition), vec!["dsrtos_timer_init"]);
        assert_eq!(one(DiagnosticKind::UndefinedReference), vec!["dsrtos_memory_init"]);
        assert_eq!(one(DiagnosticKind::UndeclaredConstant), vec!["DSRTOS_ERROR_FATAL"]);
        assert_eq!(one(DiagnosticKind::MacroRedefinition), vec!["DSRTOS_MAX_TASKS"]);
    }

    #[test]
    fn test_duplicate_subjects_collapse() {
        let classifier = DiagnosticClassifier::default();
        let diags = classifier.extract(DiagnosticKind::UndefinedReference, GCC_OUTPUT);
        assert_eq!(diags.len(), 2);
        let set = DiagnosticSet::from_diagnostics(&diags);
        assert_eq!(set.subject_count(), 1);
    }

    #[test]
    fn test_typographic_quotes() {
        let output = "boot.c:3:1: error: ‘dsrtos_uart_init’ undeclared here (not in a function)\n\
                      ld: undefined reference to ‘dsrtos_panic’";
        let set = DiagnosticClassifier::default().classify_set(output);
        assert!(set.subjects(DiagnosticKind::UndeclaredSymbol).unwrap().contains("dsrtos_uart_init"));
        assert!(set.subjects(DiagnosticKind::UndefinedReference).unwrap().contains("dsrtos_panic"));
    }

    #[test]
    fn test_function_scope_undeclared_is_not_file_scope() {
        let output = "x.c:1: error: 'tmp' undeclared (first use in this function)";
        let set = DiagnosticClassifier::default().classify_set(output);
        assert!(set.is_empty());
    }

    #[test]
    fn test_constant_filter() {
        let classifier = DiagnosticClassifier::default();
        assert!(classifier.is_project_constant("DSRTOS_HEAP_SIZE"));
        assert!(classifier.is_project_constant("DSRTOS_ERROR_2"));
        assert!(!classifier.is_project_constant("DSRTOS_heap"));
        assert!(!classifier.is_project_constant("OTHER_CONST"));

        let custom = DiagnosticClassifier::new("ACME_");
        assert!(custom.is_project_constant("ACME_LIMIT"));
    }

    #[test]
    fn test_truncated_lines_are_ignored() {
        let output = "make: *** No rule to make target 'build/obj/foo.o\n\
                      undefined reference to `\n\
                      multiple definition of";
        let set = DiagnosticClassifier::default().classify_set(output);
        assert!(set.is_empty());
    }

    #[test]
    fn test_error_excerpt_limit() {
        let excerpt = DiagnosticClassifier::error_excerpt(GCC_OUTPUT, 2);
        assert_eq!(excerpt.len(), 2);
        assert!(excerpt[0].contains("dsrtos_clock_init"));
    }

    #[test]
    fn test_memory_usage_table() {
        let output = "linking...\nMemory region         Used Size  Region Size  %age Used\n\
                      \x20          FLASH:       12840 B         1 MB      1.22%\n\
                      \x20            RAM:        4096 B       128 KB      3.12%\n\
                      \x20         CCMRAM:           0 B        64 KB      0.00%\n\
                      arm-none-eabi-objcopy -O ihex\n";
        let table = DiagnosticClassifier::memory_usage(output);
        assert_eq!(table.len(), 4);
        assert!(table[3].contains("CCMRAM"));
        assert!(DiagnosticClassifier::memory_usage("no table here").is_empty());
    }
}
