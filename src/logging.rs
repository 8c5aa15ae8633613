//! Structured logging configuration
//!
//! Provides:
//! - Pretty formatting for interactive runs
//! - JSON output for log shippers
//! - Optional daily-rolling file output
//! - A per-run identifier attached to the run span
//!
//! Diagnostics always go to stderr so `--json` summaries on stdout stay clean.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use uuid::Uuid;

const LOG_FILE_NAME: &str = "icecast-sx-report.log";

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `level` when set. The returned guard must be held for
/// the life of the program when file output is enabled.
pub fn init_logging(
    config: &LoggingConfig,
    level: &str,
    log_dir: &Path,
) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.output.as_str() {
        "file" => init_file_logging(env_filter, &config.format, log_dir).map(Some),
        "both" => init_combined_logging(env_filter, &config.format, log_dir).map(Some),
        _ => {
            init_console_logging(env_filter, &config.format);
            Ok(None)
        }
    }
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_ansi(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

fn rolling_writer(
    log_dir: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    Ok(tracing_appender::non_blocking(file_appender))
}

fn init_file_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = rolling_writer(log_dir)?;
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
    }
    Ok(guard)
}

fn init_combined_logging(filter: EnvFilter, format: &str, log_dir: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = rolling_writer(log_dir)?;
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
        }
    }
    Ok(guard)
}

/// Fresh identifier for one report run.
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
