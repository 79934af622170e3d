//! fixloop: bounded build-recovery for make-based native projects
//!
//! This library provides:
//! - A classifier turning make/gcc/ld output into typed diagnostics
//! - One corrective-action synthesizer per diagnostic kind
//! - A convergence loop that rebuilds until success, a stall, or the round budget
//!
//! # Diagnostic kinds
//!
//! | Kind | Correction |
//! |---|---|
//! | missing build rule | create or locate the source, list it in the manifest |
//! | undeclared file-scope symbol | insert a `static` forward declaration |
//! | multiple definition | remove the entry point's copy |
//! | undefined reference | write the consolidated stub file |
//! | undeclared project constant | write the constants header, include it |
//! | macro redefinition | delete the `#define` from `.c` files |
//!
//! # Usage
//!
//! ```no_run
//! use fixloop::{CommandDriver, ConvergenceConfig, ConvergenceLoop, ProjectLayout, ProjectState};
//!
//! let mut project = ProjectState::on_disk("/work/firmware", ProjectLayout::default());
//! let driver = CommandDriver::make("/work/firmware");
//! let outcome = ConvergenceLoop::new(driver, ConvergenceConfig::default())
//!     .run(&mut project)?;
//! println!("{}", outcome.summary());
//! # Ok::<(), fixloop::FixError>(())
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod archive;
pub mod error;
pub mod feedback;
pub mod project;
pub mod synthesis;

pub use error::{FixError, FixResult};

// Re-export key feedback types
pub use feedback::{
    BuildAttempt, BuildDriver, CommandDriver, ConvergenceConfig, ConvergenceLoop,
    ConvergenceOutcome, Diagnostic, DiagnosticClassifier, DiagnosticKind, DiagnosticSet,
    LoopState, RoundReport, StateTransition,
};

// Re-export project state types
pub use project::{DiskTree, MemoryTree, ProjectLayout, ProjectState, SourceTree};

// Re-export synthesis types
pub use synthesis::{CorrectiveAction, Synthesizer, SynthesizerSet};

// Re-export archive types
pub use archive::{ArtifactReport, ExportSummary, PhaseExport, SnapshotInfo};
