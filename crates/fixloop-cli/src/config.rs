//! Run configuration: defaults, then an optional TOML file, then `FIXLOOP_*`
//! environment variables, then command-line flags.

use anyhow::{bail, Context, Result};
use fixloop::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one `fixloop` run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixloopConfig {
    /// Project root; build commands run here
    pub root: PathBuf,

    /// Maximum build rounds
    pub max_iterations: u32,

    /// Append-only log file (relative to root)
    pub log_file: PathBuf,

    /// Optional JSON report of the run (relative to root)
    pub report_path: Option<PathBuf>,

    /// Clean step, split with shell-word rules
    pub clean_command: String,

    /// Build step, split with shell-word rules
    pub build_command: String,

    /// Where sources, headers and generated files live
    pub layout: ProjectLayout,
}

impl Default for FixloopConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_iterations: 7,
            log_file: PathBuf::from("dsrtos_auto_fix.log"),
            report_path: None,
            clean_command: "make clean".to_string(),
            build_command: "make".to_string(),
            layout: ProjectLayout::default(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub max_iterations: Option<u32>,
    pub log_file: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub clean_command: Option<String>,
    pub build_command: Option<String>,
}

impl FixloopConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay `FIXLOOP_*` variables, read through `lookup`. Returns warnings
    /// for values that were ignored; logging is not yet installed here.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(root) = lookup("FIXLOOP_ROOT") {
            self.root = PathBuf::from(root);
        }
        if let Some(max) = lookup("FIXLOOP_MAX_ITERATIONS") {
            match max.parse() {
                Ok(n) => self.max_iterations = n,
                Err(_) => warnings.push(format!("Ignoring unparsable FIXLOOP_MAX_ITERATIONS={}", max)),
            }
        }
        if let Some(path) = lookup("FIXLOOP_LOG_FILE") {
            self.log_file = PathBuf::from(path);
        }
        if let Some(cmd) = lookup("FIXLOOP_CLEAN_CMD") {
            self.clean_command = cmd;
        }
        if let Some(cmd) = lookup("FIXLOOP_BUILD_CMD") {
            self.build_command = cmd;
        }
        warnings
    }

    /// Overlay command-line values
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(root) = overrides.root {
            self.root = root;
        }
        if let Some(max) = overrides.max_iterations {
            self.max_iterations = max;
        }
        if let Some(path) = overrides.log_file {
            self.log_file = path;
        }
        if let Some(path) = overrides.report_path {
            self.report_path = Some(path);
        }
        if let Some(cmd) = overrides.clean_command {
            self.clean_command = cmd;
        }
        if let Some(cmd) = overrides.build_command {
            self.build_command = cmd;
        }
    }

    /// Resolve paths relative to the project root
    pub fn resolve_paths(&mut self) {
        if self.log_file.is_relative() {
            self.log_file = self.root.join(&self.log_file);
        }
        self.report_path = self.report_path.take().map(|report| {
            if report.is_relative() {
                self.root.join(report)
            } else {
                report
            }
        });
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        if !self.root.is_dir() {
            bail!("Project root {} is not a directory", self.root.display());
        }
        Ok(())
    }

    /// Full layering: defaults → file → environment → flags, then validation.
    /// Also returns the environment layer's warnings.
    pub fn load(config_file: Option<&Path>, overrides: Overrides) -> Result<(Self, Vec<String>)> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let warnings = config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config.resolve_paths();
        config.validate()?;
        Ok((config, warnings))
    }
}
