//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env("DAYMARK_LOG").unwrap_or_else(|_| EnvFilter::new(level))
}

/// Logs to stderr. Used by the one-shot CLI commands.
///
/// Subsequent calls are no-ops.
pub fn init_stderr(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    let _ = subscriber.try_init();
}

/// Logs to a daily-rolling `daymark.log` in `dir` so the interactive screen
/// stays clean. Keep the guard alive until exit or buffered lines are lost.
pub fn init_file(dir: &Path, level: &str) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir, "daymark.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_ansi(false)
        .with_writer(writer);
    let _ = subscriber.try_init();
    guard
}
