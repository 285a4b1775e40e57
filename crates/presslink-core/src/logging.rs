//! Logging setup for embedders
//!
//! The bridge is a library and never initializes logging on its own. A host
//! that wants the session log calls [`init`] once at startup; everything in
//! the workspace logs through `tracing` and ends up in the daily-rolled file.

use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

const LOG_FILE_PREFIX: &str = "presslink.log";

/// Initialize logging into the default per-user data directory
///
/// Log level is controlled by the `PRESSLINK_LOG` environment variable,
/// e.g. `PRESSLINK_LOG=presslink_session=trace`.
pub fn init() -> Result<()> {
    init_at(&default_log_dir()?)
}

/// Initialize logging into a caller-chosen directory
pub fn init_at(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);

    let env_filter = EnvFilter::try_from_env("PRESSLINK_LOG").unwrap_or_else(|_| {
        EnvFilter::new("presslink=info,presslink_core=info,presslink_session=info,warn")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("presslink logging initialized at {}", log_dir.display());

    Ok(())
}

/// Per-user directory the session log rolls into
pub fn default_log_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| Error::config("no local data directory on this platform"))?;
    Ok(base.join("presslink").join("logs"))
}
