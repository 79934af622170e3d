//! Operator output on stdout plus an append-only, timestamped log file.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Open `path` for appending, creating it and its parent directories
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: &Path) -> Result<()> {
    subscriber(log_file)?
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Stdout layer plus the log-file layer, both behind the env filter
pub fn subscriber(log_file: &Path) -> Result<impl Subscriber + Send + Sync> {
    let file = open_log_file(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let stdout_layer = fmt::layer().with_target(false).without_time();

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
        .with_writer(Mutex::new(file));

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer))
}
