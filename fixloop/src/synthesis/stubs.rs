//! Undefined reference → consolidated stub file.
//!
//! All unresolved symbols of a round go into one file under the source root,
//! rewritten from scratch each time. The body of each stub is picked from the
//! symbol name so that safety-relevant queries get conservative answers.

use super::templates::stub_file_header;
use super::{banner_date, CorrectiveAction, Synthesizer};
use crate::error::{FixError, FixResult};
use crate::feedback::classifier::DiagnosticKind;
use crate::project::ProjectState;
use std::collections::BTreeSet;

/// Stub shape chosen from the symbol name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    /// `bool f(uint32_t)` → false (not critical)
    CriticalityCheck,
    /// `bool f(uint32_t)` → false (no shutdown)
    ShutdownCheck,
    /// `uint32_t f(void)` → 0U (success)
    MemoryInit,
    /// Fills total / allocated / peak out-pointers
    MemoryStats,
    /// Never-returning trap
    FailSafeTrap,
    /// Guard variable, not a function
    GuardValue,
    /// `uint32_t f(void)` → 0U
    Generic,
}

impl StubKind {
    pub fn for_symbol(symbol: &str) -> Self {
        if symbol == "__stack_chk_fail" {
            Self::FailSafeTrap
        } else if symbol == "__stack_chk_guard" {
            Self::GuardValue
        } else if symbol.contains("error_is_critical") {
            Self::CriticalityCheck
        } else if symbol.contains("error_requires_shutdown") {
            Self::ShutdownCheck
        } else if symbol.contains("memory_init") {
            Self::MemoryInit
        } else if symbol.contains("memory_get_stats") {
            Self::MemoryStats
        } else {
            Self::Generic
        }
    }

    /// C definition of `symbol` in this shape
    pub fn render(&self, symbol: &str) -> String {
        match self {
            Self::CriticalityCheck | Self::ShutdownCheck => format!(
                "bool {symbol}(uint32_t error_code)\n{{\n    (void)error_code;\n    return false;\n}}\n"
            ),
            Self::MemoryInit | Self::Generic => {
                format!("uint32_t {symbol}(void)\n{{\n    return 0U;\n}}\n")
            }
            Self::MemoryStats => format!(
                "void {symbol}(uint32_t* total_ptr, uint32_t* allocated_ptr, uint32_t* peak_ptr)\n\
                 {{\n\
                 \x20   if (((void*)0) != total_ptr) {{ *total_ptr = 32768U; }}\n\
                 \x20   if (((void*)0) != allocated_ptr) {{ *allocated_ptr = 0U; }}\n\
                 \x20   if (((void*)0) != peak_ptr) {{ *peak_ptr = 0U; }}\n\
                 }}\n"
            ),
            Self::FailSafeTrap => format!(
                "void {symbol}(void)\n{{\n    for (;;)\n    {{\n        /* fail-safe trap */\n    }}\n}}\n"
            ),
            Self::GuardValue => format!("uint32_t {symbol} = 0xDEADBEEFU;\n"),
        }
    }
}

/// Full stub file body for `symbols`, in sorted order
pub fn render_stub_file(file_name: &str, date: &str, symbols: &BTreeSet<String>) -> String {
    let mut out = stub_file_header(file_name, date);
    for symbol in symbols {
        out.push('\n');
        out.push_str(&StubKind::for_symbol(symbol).render(symbol));
    }
    out
}

/// Handles ``undefined reference to `X'``.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubSynthesizer;

impl Synthesizer for StubSynthesizer {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::UndefinedReference
    }

    fn apply(
        &self,
        state: &mut ProjectState,
        subjects: &BTreeSet<String>,
    ) -> FixResult<CorrectiveAction> {
        let mut action = CorrectiveAction::new(self.kind(), subjects);
        let path = state.layout().stub_path();
        let file_name = state.layout().stub_file.clone();

        let existing = match state.read(&path) {
            Ok(content) => Some(content),
            Err(FixError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        // Only the date banner may differ between renders of the same symbols
        let up_to_date = existing
            .as_deref()
            .map(|content| same_stubs(content, &file_name, subjects))
            .unwrap_or(false);

        if !up_to_date {
            let body = render_stub_file(&file_name, &banner_date(), subjects);
            state.write(&path, &body)?;
            tracing::info!(path = %path.display(), count = subjects.len(), "Wrote stub file");
            action.touch(&path);
        }

        if state.register_source(&path)? {
            action.touch(&state.layout().manifest);
        }

        let description = if action.changed() {
            format!("stubbed [{}]", action.subjects.join(", "))
        } else {
            "stub file already current".to_string()
        };
        Ok(action.describe(description))
    }
}

/// Whether `content` is a render of exactly `symbols`, ignoring the banner date
fn same_stubs(content: &str, file_name: &str, symbols: &BTreeSet<String>) -> bool {
    let strip_date = |s: &str| -> String {
        s.lines()
            .filter(|line| !line.trim_start().starts_with("* @date"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    strip_date(content) == strip_date(&render_stub_file(file_name, "", symbols))
}
