//! Logging setup: independent screen and file thresholds, reproducing the
//! reference implementation's `dolog` dual-gate (a line reaches the screen
//! if its level clears `log_level_screen`, the file independently if it
//! clears `log_level_file`).

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LogLevel;
use crate::error::{BadankError, Result};

/// `LogLevel::Notice` has no `tracing::Level` counterpart; it is treated as
/// sitting just above `INFO` for filter purposes (see DESIGN.md).
fn to_level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info | LogLevel::Notice => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// Must be kept alive for the lifetime of the process; dropping it stops
/// the non-blocking file writer from flushing.
pub struct LoggingGuard(#[allow(dead_code)] WorkerGuard);

pub fn init(log_file: &Path, screen: LogLevel, file: LogLevel) -> Result<LoggingGuard> {
    let log_file_handle = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| {
            BadankError::Config(format!("cannot open log file {}: {e}", log_file.display()))
        })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file_handle);

    let screen_layer = fmt::layer()
        .with_target(false)
        .with_filter(to_level_filter(screen));
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(to_level_filter(file));

    tracing_subscriber::registry()
        .with(screen_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard(guard))
}
