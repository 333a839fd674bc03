//! # Logging Setup
//!
//! Installs the global `tracing` subscriber:
//! - an `EnvFilter` honouring `RUST_LOG`, falling back to the configured level,
//! - a console layer with targets and ANSI colors,
//! - optionally a JSON file layer on a daily-rolling, non-blocking appender.
//!
//! The returned [`WorkerGuard`] flushes the file writer on drop and must live as long as
//! the process logs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Number of rolled files kept per application.
pub const KEEP_LOG_FILES: usize = 7;

/// Installs the global subscriber for `app_name`.
///
/// With `log_dir` set, files named `{app_name}.YYYY-MM-DD` are written there and older ones
/// beyond [`KEEP_LOG_FILES`] are removed first.
///
/// # Errors
/// Fails if the directory cannot be created, the level is not a valid filter, or a global
/// subscriber is already installed.
pub fn setup_logging(app_name: &str, log_dir: Option<&Path>, log_level: &str) -> Result<Option<WorkerGuard>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level).with_context(|| format!("invalid log level '{log_level}'"))?,
    };

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .context("global subscriber already installed")?;
        info!(level = log_level, "Logging initialized (console only)");
        return Ok(None);
    };

    fs::create_dir_all(dir).with_context(|| format!("cannot create log dir {}", dir.display()))?;
    let removed = prune_old_logs(dir, app_name, KEEP_LOG_FILES)?;

    let (writer, guard) = non_blocking(rolling::daily(dir, app_name));
    let file_layer = fmt::layer().with_ansi(false).with_writer(writer).json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("global subscriber already installed")?;

    info!(level = log_level, dir = %dir.display(), pruned = removed, "Logging initialized");
    Ok(Some(guard))
}

/// Keeps the newest `keep` log files of `app_name` in `dir` and deletes the rest.
///
/// Files belong to the application when their name starts with `{app_name}.`; the
/// date suffix makes name order match age order. Returns how many files were removed.
pub fn prune_old_logs(dir: &Path, app_name: &str, keep: usize) -> Result<usize> {
    let prefix = format!("{app_name}.");
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("cannot list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();

    // Newest first.
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old in files.iter().skip(keep) {
        match fs::remove_file(old) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Error deleting old log file {}: {}", old.display(), e),
        }
    }
    Ok(removed)
}
