//! Build Feedback Module
//!
//! Provides the bounded build-recovery loop:
//! - Run the build tool (clean + build) and capture its output
//! - Classify the output into typed diagnostics
//! - Apply one corrective action per diagnostic kind, then rebuild
//!
//! # Architecture
//!
//! ```text
//! ProjectState → BuildDriver → DiagnosticClassifier → SynthesizerSet → ProjectState
//!                    ↑                                                     |
//!                    └───────────────── ConvergenceLoop ───────────────────┘
//! ```

pub mod classifier;
pub mod convergence;
pub mod driver;

pub use classifier::{Diagnostic, DiagnosticClassifier, DiagnosticKind, DiagnosticSet};
pub use convergence::{
    ConvergenceConfig, ConvergenceLoop, ConvergenceOutcome, LoopState, RoundReport,
    StateTransition,
};
pub use driver::{BuildAttempt, BuildDriver, CommandDriver};
