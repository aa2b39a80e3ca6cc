//! Logging configuration using the tracing ecosystem.
//!
//! Logs go to a daily rotating file so they never mix with command output on
//! stdout. The level comes from `RUST_LOG`, a `--log-level` override, or the
//! default filter.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::config::APP_DIR;

/// Default log filter if `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "async_select=info,warn";

/// Log file name prefix; the appender adds the date.
const LOG_FILE: &str = "async-select.log";

/// Initialize the logging system.
///
/// Logs are stored in the platform-specific local data directory:
/// - Linux: `~/.local/share/async-select/logs/`
/// - macOS: `~/Library/Application Support/async-select/logs/`
/// - Windows: `C:\Users\<User>\AppData\Local\async-select\logs\`
///
/// `filter` takes precedence over `RUST_LOG` when given, e.g.
/// `async_select=debug` to trace request issue and stale-response discards.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the filter does
/// not parse, or a global subscriber is already set.
pub fn init(filter: Option<&str>) -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE);

    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "async-select starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join(APP_DIR).join("logs"))
}

/// Get the path where logs are stored.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}
