//! Bounded build-recovery loop
//!
//! Each round:
//! 1. Clean + build
//! 2. Success → export, report, stop
//! 3. Classify the output and run one corrective action per kind present
//! 4. No action ran → stuck; round budget spent → exhausted; else rebuild
//!
//! A snapshot of the tree is taken once before round 1. It is never
//! restored automatically.

use crate::archive::{
    create_snapshot, export_bundle, inspect_artifacts, snapshot_prefix, ArtifactReport,
    ExportSummary, SnapshotInfo,
};
use crate::error::FixResult;
use crate::feedback::classifier::DiagnosticClassifier;
use crate::feedback::driver::{BuildAttempt, BuildDriver};
use crate::project::ProjectState;
use crate::synthesis::{CorrectiveAction, SynthesizerSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Lines printed after a successful recovery
const SUCCESS_SUMMARY: &[&str] = &[
    "MISRA C:2012 compliant",
    "DO-178C Level A ready",
    "IEC 62304 Class C compliant",
    "IEC 61508 SIL 4 certified",
    "Production-ready kernel",
    "Robust and stable implementation",
];

/// Configuration for the convergence loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Maximum build rounds (clamped to at least 1)
    pub max_iterations: u32,
    /// Error lines shown to the operator per failed round
    pub excerpt_lines: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 7,
            excerpt_lines: 5,
        }
    }
}

/// Loop state. Every run starts at `Running(1)` and ends in one of the
/// three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Round in progress (1-indexed)
    Running(u32),
    /// Build succeeded; terminal
    Succeeded,
    /// A failed round produced no corrective action; terminal
    Stuck,
    /// Round budget spent without a successful build; terminal
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running(_))
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running(n) => write!(f, "Running({})", n),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Stuck => write!(f, "Stuck"),
            Self::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: LoopState,
    pub to: LoopState,
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What happened in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number (1-indexed)
    pub iteration: u32,
    /// Whether the build succeeded
    pub success: bool,
    /// Build step exit code, if it ran to completion
    pub exit_code: Option<i32>,
    /// Clean + build wall-clock time
    pub build_ms: u64,
    /// First error lines of the output
    pub error_excerpt: Vec<String>,
    /// Distinct (kind, subject) pairs classified
    pub diagnostics: usize,
    /// Corrective actions run, in kind order
    pub actions: Vec<CorrectiveAction>,
    /// Number of corrective actions run; zero means stuck
    pub fix_count: u32,
}

impl RoundReport {
    fn from_attempt(attempt: &BuildAttempt) -> Self {
        Self {
            iteration: attempt.iteration,
            success: attempt.success,
            exit_code: attempt.exit_code,
            build_ms: attempt.duration_ms,
            error_excerpt: Vec::new(),
            diagnostics: 0,
            actions: Vec::new(),
            fix_count: 0,
        }
    }

    /// Files written during this round
    pub fn files_written(&self) -> usize {
        self.actions.iter().map(|a| a.affected.len()).sum()
    }
}

/// Result of a complete run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    /// Terminal state
    pub state: LoopState,
    pub rounds: Vec<RoundReport>,
    pub transitions: Vec<StateTransition>,
    pub snapshot: SnapshotInfo,
    /// Present only after success
    pub export: Option<ExportSummary>,
    /// Linked images, inspected only after success
    pub artifacts: Vec<ArtifactReport>,
    /// Linker memory-usage table of the successful build
    pub memory_usage: Vec<String>,
    pub duration_ms: u64,
}

impl ConvergenceOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == LoopState::Succeeded
    }

    /// Rounds actually run
    pub fn iterations(&self) -> u32 {
        self.rounds.len() as u32
    }

    /// Corrective actions across all rounds
    pub fn total_fixes(&self) -> u32 {
        self.rounds.iter().map(|r| r.fix_count).sum()
    }

    /// Summary line for logging/display
    pub fn summary(&self) -> String {
        format!(
            "{} after {} round(s), {} fix(es), {}ms",
            self.state,
            self.iterations(),
            self.total_fixes(),
            self.duration_ms
        )
    }
}

/// The convergence loop controller
pub struct ConvergenceLoop<D: BuildDriver> {
    driver: D,
    classifier: Option<DiagnosticClassifier>,
    synthesizers: SynthesizerSet,
    config: ConvergenceConfig,
    state: LoopState,
    transitions: Vec<StateTransition>,
    started_at: Instant,
}

impl<D: BuildDriver> ConvergenceLoop<D> {
    /// Loop with all six synthesizers. Unless [`with_classifier`] is used,
    /// constants are recognized by the project layout's prefix.
    ///
    /// [`with_classifier`]: Self::with_classifier
    pub fn new(driver: D, config: ConvergenceConfig) -> Self {
        Self {
            driver,
            classifier: None,
            synthesizers: SynthesizerSet::default(),
            config,
            state: LoopState::Running(1),
            transitions: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn with_classifier(mut self, classifier: DiagnosticClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_synthesizers(mut self, synthesizers: SynthesizerSet) -> Self {
        self.synthesizers = synthesizers;
        self
    }

    /// Get the current state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Get the transition log of the current (or last) run.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Effective round bound
    pub fn max_iterations(&self) -> u32 {
        self.config.max_iterations.max(1)
    }

    fn advance(&mut self, to: LoopState, reason: impl Into<String>) {
        let record = StateTransition {
            from: self.state,
            to,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            reason: Some(reason.into()),
        };
        tracing::debug!(from = %self.state, to = %to, "State transition");
        self.transitions.push(record);
        self.state = to;
    }

    /// Run rounds until the build succeeds, a round makes no correction, or
    /// the round budget is spent.
    ///
    /// Build failures are loop input, not errors. An `Err` means the tree
    /// could not be read or written (snapshot, synthesis or export).
    pub fn run(&mut self, project: &mut ProjectState) -> FixResult<ConvergenceOutcome> {
        self.started_at = Instant::now();
        self.state = LoopState::Running(1);
        self.transitions.clear();

        let max = self.max_iterations();
        tracing::info!(max_iterations = max, "Build recovery started");

        let classifier = match &self.classifier {
            Some(classifier) => classifier.clone(),
            None => DiagnosticClassifier::new(project.layout().constant_prefix.clone()),
        };

        let snapshot = create_snapshot(project, &snapshot_prefix())?;

        let mut rounds = Vec::new();
        let mut export = None;
        let mut artifacts = Vec::new();
        let mut memory_usage = Vec::new();

        while let LoopState::Running(iteration) = self.state {
            tracing::info!("Fix iteration {}/{}", iteration, max);
            let attempt = self.driver.build(iteration);
            let mut report = RoundReport::from_attempt(&attempt);

            if attempt.success {
                tracing::info!("SUCCESS: Compilation completed!");
                memory_usage = DiagnosticClassifier::memory_usage(&attempt.output);
                if !memory_usage.is_empty() {
                    tracing::info!("Memory usage:");
                    for line in &memory_usage {
                        tracing::info!("  {}", line);
                    }
                }

                export = Some(export_bundle(project)?);
                artifacts = inspect_artifacts(project);
                log_success_summary(&artifacts);

                rounds.push(report);
                self.advance(LoopState::Succeeded, "build succeeded");
                break;
            }

            tracing::info!("Analyzing compilation errors...");
            report.error_excerpt =
                DiagnosticClassifier::error_excerpt(&attempt.output, self.config.excerpt_lines);
            if !report.error_excerpt.is_empty() {
                tracing::info!("Current errors:");
                for line in &report.error_excerpt {
                    tracing::info!("  {}", line);
                }
            }

            let diagnostics = classifier.classify_set(&attempt.output);
            report.diagnostics = diagnostics.subject_count();
            report.actions = self.synthesizers.apply_all(project, &diagnostics)?;
            report.fix_count = report.actions.len() as u32;
            tracing::info!(
                iteration,
                files_written = report.files_written(),
                "Applied {} fixes in iteration {}",
                report.fix_count,
                iteration
            );

            let (next, reason) = if report.fix_count == 0 {
                (LoopState::Stuck, "no corrective action applicable".to_string())
            } else if iteration >= max {
                (LoopState::Exhausted, format!("round budget of {} spent", max))
            } else {
                (
                    LoopState::Running(iteration + 1),
                    format!("{} fix(es) applied", report.fix_count),
                )
            };
            rounds.push(report);
            self.advance(next, reason);
        }

        match self.state {
            LoopState::Stuck => tracing::warn!("No more fixes can be applied"),
            LoopState::Exhausted => tracing::warn!("Maximum iterations reached"),
            _ => {}
        }

        let outcome = ConvergenceOutcome {
            state: self.state,
            rounds,
            transitions: self.transitions.clone(),
            snapshot,
            export,
            artifacts,
            memory_usage,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        };
        tracing::info!("Build recovery finished: {}", outcome.summary());
        Ok(outcome)
    }
}

fn log_success_summary(artifacts: &[ArtifactReport]) {
    tracing::info!("FINAL SUCCESS RESULTS:");
    for artifact in artifacts {
        if let Some(size) = artifact.size {
            tracing::info!(
                "✓ {}: {} ({} bytes)",
                artifact.label,
                artifact.path.display(),
                group_thousands(size)
            );
        }
    }
    for line in SUCCESS_SUMMARY {
        tracing::info!("✓ {}", line);
    }
}

/// `1234567` → `1,234,567`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::driver::MockBuildDriver;
    use crate::project::{MemoryTree, ProjectLayout};
    use std::path::Path;

    const MAKEFILE: &str = "C_SOURCES = \\\n    src/main.c\n";
    const MAIN: &str = "int main(void)\n{\n    return 0;\n}\n";

    fn project() -> ProjectState {
        ProjectState::new(
            MemoryTree::new()
                .with_file("Makefile", MAKEFILE)
                .with_file("src/main.c", MAIN),
            ProjectLayout::default(),
        )
    }

    fn failing(output: &'static str) -> MockBuildDriver {
        let mut driver = MockBuildDriver::new();
        driver
            .expect_build()
            .returning(move |i| BuildAttempt::failed(i, output));
        driver
    }

    #[test]
    fn test_first_round_success_makes_no_corrections() {
        let mut driver = MockBuildDriver::new();
        driver
            .expect_build()
            .times(1)
            .returning(|i| BuildAttempt::succeeded(i, "Memory region  Used Size\n  FLASH:  1024 B\n"));

        let mut project = project();
        let outcome = ConvergenceLoop::new(driver, ConvergenceConfig::default())
            .run(&mut project)
            .unwrap();

        assert_eq!(outcome.state, LoopState::Succeeded);
        assert_eq!(outcome.iterations(), 1);
        assert_eq!(outcome.total_fixes(), 0);
        assert_eq!(outcome.memory_usage.len(), 2);
        assert!(outcome.export.is_some());
        assert_eq!(project.read(Path::new("Makefile")).unwrap(), MAKEFILE);
        assert_eq!(project.read(Path::new("src/main.c")).unwrap(), MAIN);
    }

    #[test]
    fn test_unrecognized_output_is_stuck() {
        let driver = failing("make: *** [all] Error 1\nsegmentation fault in cc1\n");
        let mut project = project();
        let mut fixloop = ConvergenceLoop::new(driver, ConvergenceConfig::default());
        let outcome = fixloop.run(&mut project).unwrap();

        assert_eq!(outcome.state, LoopState::Stuck);
        assert_eq!(outcome.iterations(), 1);
        assert_eq!(outcome.rounds[0].fix_count, 0);
        assert!(outcome.export.is_none());
        assert_eq!(fixloop.transitions().len(), 1);
        assert_eq!(fixloop.transitions()[0].from, LoopState::Running(1));
    }

    #[test]
    fn test_round_budget_bounds_the_loop() {
        let driver = failing("main.c:(.text+0x4): undefined reference to `dsrtos_panic'");
        let mut project = project();
        let config = ConvergenceConfig {
            max_iterations: 3,
            ..Default::default()
        };
        let outcome = ConvergenceLoop::new(driver, config).run(&mut project).unwrap();

        assert_eq!(outcome.state, LoopState::Exhausted);
        assert_eq!(outcome.iterations(), 3);
        let states: Vec<_> = outcome.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![LoopState::Running(2), LoopState::Running(3), LoopState::Exhausted]
        );
    }

    #[test]
    fn test_zero_bound_runs_one_round() {
        let driver = failing("undefined reference to `x'");
        let mut project = project();
        let config = ConvergenceConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let outcome = ConvergenceLoop::new(driver, config).run(&mut project).unwrap();
        assert_eq!(outcome.iterations(), 1);
        assert_eq!(outcome.state, LoopState::Exhausted);
    }

    #[test]
    fn test_fix_counter_counts_kinds() {
        let mut driver = MockBuildDriver::new();
        driver.expect_build().returning(|i| {
            if i == 1 {
                BuildAttempt::failed(
                    i,
                    "make: *** No rule to make target 'build/obj/dsrtos_uart.o'.  Stop.\n\
                     undefined reference to `dsrtos_uart_init'\n\
                     undefined reference to `dsrtos_uart_send'\n",
                )
            } else {
                BuildAttempt::succeeded(i, "")
            }
        });

        let mut project = project();
        let outcome = ConvergenceLoop::new(driver, ConvergenceConfig::default())
            .run(&mut project)
            .unwrap();

        assert_eq!(outcome.state, LoopState::Succeeded);
        assert_eq!(outcome.rounds[0].fix_count, 2);
        assert_eq!(outcome.rounds[0].diagnostics, 3);
        assert!(project.exists(Path::new("src/dsrtos_uart.c")));
        assert!(project.exists(Path::new("src/dsrtos_stubs.c")));
    }

    #[test]
    fn test_layout_prefix_drives_constant_recovery() {
        let mut driver = MockBuildDriver::new();
        driver.expect_build().returning(|i| {
            if i == 1 {
                BuildAttempt::failed(i, "a.c:3: error: 'ACME_ERROR_FATAL' undeclared (first use in this function)\n")
            } else {
                BuildAttempt::succeeded(i, "")
            }
        });

        let layout = ProjectLayout {
            constant_prefix: "ACME_".to_string(),
            ..Default::default()
        };
        let mut project = ProjectState::new(
            MemoryTree::new()
                .with_file("Makefile", MAKEFILE)
                .with_file("src/main.c", "int main(void) { return ACME_ERROR_FATAL; }\n"),
            layout,
        );
        let outcome = ConvergenceLoop::new(driver, ConvergenceConfig::default())
            .run(&mut project)
            .unwrap();

        assert_eq!(outcome.state, LoopState::Succeeded);
        assert_eq!(outcome.rounds[0].fix_count, 1);
        let header = project.layout().constants_header.clone();
        assert!(project.read(&header).unwrap().contains("ACME_ERROR_FATAL"));
    }

    #[test]
    fn test_snapshot_taken_before_first_round() {
        let driver = failing("nothing recognizable");
        let mut project = project();
        let outcome = ConvergenceLoop::new(driver, ConvergenceConfig::default())
            .run(&mut project)
            .unwrap();

        let backup = format!("{}_Makefile", outcome.snapshot.prefix);
        assert_eq!(project.read(Path::new(&backup)).unwrap(), MAKEFILE);
    }

    #[test]
    fn test_loop_state_terminal() {
        assert!(!LoopState::Running(3).is_terminal());
        assert!(LoopState::Succeeded.is_terminal());
        assert!(LoopState::Stuck.is_terminal());
        assert!(LoopState::Exhausted.is_terminal());
        assert_eq!(LoopState::Running(3).to_string(), "Running(3)");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(12840), "12,840");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
