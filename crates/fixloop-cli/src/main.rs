mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use config::{FixloopConfig, Overrides};
use fixloop::{
    CommandDriver, ConvergenceConfig, ConvergenceLoop, ConvergenceOutcome, ProjectState,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Rebuild a failing make-based project, correcting recognized diagnostics
/// between rounds until it links or no correction applies.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project root (overrides FIXLOOP_ROOT)
    #[arg(long)]
    root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum build rounds (overrides FIXLOOP_MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Append-only log file (overrides FIXLOOP_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Clean command (overrides FIXLOOP_CLEAN_CMD)
    #[arg(long)]
    clean_cmd: Option<String>,

    /// Build command (overrides FIXLOOP_BUILD_CMD)
    #[arg(long)]
    build_cmd: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            max_iterations: self.max_iterations,
            log_file: self.log_file.clone(),
            report_path: self.report.clone(),
            clean_command: self.clean_cmd.clone(),
            build_command: self.build_cmd.clone(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let (config, warnings) = FixloopConfig::load(args.config.as_deref(), args.overrides())?;
    logging::init(&config.log_file)?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    let outcome = run(&config)?;

    if let Some(path) = &config.report_path {
        write_report(path, &outcome)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(log_verdict(&config, &outcome))
}

/// Final operator verdict, logged so the log file carries it too
fn log_verdict(config: &FixloopConfig, outcome: &ConvergenceOutcome) -> ExitCode {
    if outcome.succeeded() {
        info!("SUCCESS: compilation completed");
        info!(
            "   Binary files generated in {}/",
            config.layout.artifact_dir.display()
        );
        if let Some(export) = &outcome.export {
            info!("   Phase exports created: {}", export);
        }
        ExitCode::SUCCESS
    } else {
        error!("ERROR: Could not resolve all compilation errors");
        error!("FAILED: check {} for details", config.log_file.display());
        ExitCode::FAILURE
    }
}

fn run(config: &FixloopConfig) -> Result<ConvergenceOutcome> {
    info!(root = %config.root.display(), "Build recovery for {}", config.root.display());

    let driver =
        CommandDriver::from_commands(&config.root, &config.clean_command, &config.build_command)?;
    let mut project = ProjectState::on_disk(&config.root, config.layout.clone());

    let loop_config = ConvergenceConfig {
        max_iterations: config.max_iterations,
        ..Default::default()
    };

    ConvergenceLoop::new(driver, loop_config)
        .run(&mut project)
        .context("Build recovery aborted")
}

fn write_report(path: &Path, outcome: &ConvergenceOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("Failed to serialize report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))
}
