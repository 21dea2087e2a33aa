use std::path::Path;

use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

pub fn log_file_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{prefix}_log_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

/// Console (stderr) plus a fresh timestamped file in `log_dir`. Keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init(log_dir: &Path, prefix: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file_name(prefix, Local::now()));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}
