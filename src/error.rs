//! Error types shared by every component.

use thiserror::Error;

/// Errors raised by the task store, the sync layer and the command handlers.
///
/// Most of these never reach the user: load-time parse failures degrade to an
/// empty collection and network failures degrade to local-only mode. The
/// variants exist so the layers that *do* swallow them can log what happened.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a data file failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A data file or response body was not valid JSON for the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The HTTP transport failed (unreachable host, reset connection, ...).
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote store answered with a non-2xx status.
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },
    /// A task or template title was empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,
    /// A date string was not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("task {0} not found")]
    TaskNotFound(String),
    #[error("default {0} not found")]
    TemplateNotFound(String),
    /// Weekdays are numbered 0 (Sunday) through 6 (Saturday).
    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    /// The storage directory watcher could not be started.
    #[error("watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_code_and_body() {
        let err = Error::Status { status: 401, body: "no token".into() };
        assert_eq!(err.to_string(), "remote returned 401: no token");
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn invalid_date_display() {
        let err = Error::InvalidDate("2025-13-01".into());
        assert!(err.to_string().contains("2025-13-01"));
    }
}
