//! Build tool wrapper
//!
//! Runs the clean + build command pair and captures combined output. A tool
//! that cannot be spawned is reported as a failed attempt whose output is the
//! spawn error, never as a separate error channel.

use crate::error::{FixError, FixResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

/// One invocation of the build tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAttempt {
    /// Round number (1-indexed)
    pub iteration: u32,
    /// Whether the build step exited successfully
    pub success: bool,
    /// Exit code of the build step, if it ran to completion
    pub exit_code: Option<i32>,
    /// Combined stdout + stderr, or the invocation failure description
    pub output: String,
    /// Wall-clock time of clean + build
    pub duration_ms: u64,
}

impl BuildAttempt {
    /// A failed attempt carrying only a failure description
    pub fn failed(iteration: u32, output: impl Into<String>) -> Self {
        Self {
            iteration,
            success: false,
            exit_code: None,
            output: output.into(),
            duration_ms: 0,
        }
    }

    /// A successful attempt with the given output
    pub fn succeeded(iteration: u32, output: impl Into<String>) -> Self {
        Self {
            iteration,
            success: true,
            exit_code: Some(0),
            output: output.into(),
            duration_ms: 0,
        }
    }
}

/// Something that can build the project and report the outcome.
#[cfg_attr(test, mockall::automock)]
pub trait BuildDriver {
    /// Clean, then build. Must not fail: invocation problems become a
    /// non-success attempt.
    fn build(&mut self, iteration: u32) -> BuildAttempt;
}

/// Drives an external command-line build tool (make by default)
#[derive(Debug, Clone)]
pub struct CommandDriver {
    /// Directory both commands run in
    working_dir: PathBuf,
    /// argv of the clean step
    clean: Vec<String>,
    /// argv of the build step
    build: Vec<String>,
}

impl CommandDriver {
    /// `make clean` / `make` in `working_dir`
    pub fn make(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            clean: vec!["make".into(), "clean".into()],
            build: vec!["make".into()],
        }
    }

    /// Driver from shell-style command strings, e.g. `"make -j4 all"`
    pub fn from_commands(
        working_dir: impl AsRef<Path>,
        clean: &str,
        build: &str,
    ) -> FixResult<Self> {
        Ok(Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            clean: split_command("clean", clean)?,
            build: split_command("build", build)?,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run one argv to completion, capturing output
    fn run(&self, argv: &[String]) -> std::io::Result<std::process::Output> {
        // argv is non-empty by construction
        Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(&self.working_dir)
            .output()
    }
}

fn split_command(role: &str, command: &str) -> FixResult<Vec<String>> {
    let argv = shlex::split(command)
        .ok_or_else(|| FixError::invalid_command(role, format!("unbalanced quoting in '{}'", command)))?;
    if argv.is_empty() {
        return Err(FixError::invalid_command(role, "empty command"));
    }
    Ok(argv)
}

impl BuildDriver for CommandDriver {
    fn build(&mut self, iteration: u32) -> BuildAttempt {
        let start = Instant::now();

        // Clean step's exit status is irrelevant; only a spawn failure counts
        if let Err(e) = self.run(&self.clean) {
            tracing::warn!(command = %self.clean.join(" "), "Failed to run clean step: {}", e);
            return BuildAttempt {
                duration_ms: start.elapsed().as_millis() as u64,
                ..BuildAttempt::failed(iteration, format!("Failed to run {}: {}", self.clean[0], e))
            };
        }

        match self.run(&self.build) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                BuildAttempt {
                    iteration,
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    output: format!("{}{}", stdout, stderr),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                tracing::warn!(command = %self.build.join(" "), "Failed to run build step: {}", e);
                BuildAttempt {
                    duration_ms: start.elapsed().as_millis() as u64,
                    ..BuildAttempt::failed(iteration, format!("Failed to run {}: {}", self.build[0], e))
                }
            }
        }
    }
}
