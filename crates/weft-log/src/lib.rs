// ABOUTME: Shared logging setup for weft binaries
// ABOUTME: init() logs to stderr, init_file() logs to a per-app file under the config dir

use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// File-based logging, for runs whose stdout is machine-read.
/// Default: WARN level, RUST_LOG override.
/// Logs to {dir}/{app_name}.log, where `dir` is the caller's config directory
/// (weft binaries pass `Config::config_dir()`).
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(dir: &Path, app_name: &str) {
    if let Err(e) = init_file_inner(dir, app_name) {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

/// Path of the log file init_file() writes for `app_name` under `dir`
pub fn log_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{app_name}.log"))
}

fn init_file_inner(dir: &Path, app_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let path = log_path(dir, app_name);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_ansi(false)
        .init();

    Ok(())
}
