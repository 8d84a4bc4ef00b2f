//! Settings loading with environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If `config.json` exists next to the tasks file, read it; keys it
//!    leaves out keep their defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Upper bound for `window.days_ahead` (about ten years).
pub const MAX_DAYS_AHEAD: i64 = 3650;
/// Upper bound for `retention_days` (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36500;

/// Materialization window policy. The lower bound is a fixed day of the
/// current year; the upper bound is relative to today.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WindowSettings {
    pub start_month: u32,
    pub start_day: u32,
    pub days_ahead: i64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            start_month: 11,
            start_day: 1,
            days_ahead: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the remote task store, e.g. `http://localhost:3000/api`.
    /// `None` keeps the client local-only.
    pub server_url: Option<String>,
    pub window: WindowSettings,
    /// Tasks dated this many days ago or earlier are purged at load.
    pub retention_days: i64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            window: WindowSettings::default(),
            retention_days: 365,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` with env var overrides.
    ///
    /// A missing file yields defaults; invalid JSON is an error.
    pub fn load(path: &Path) -> Result<Settings> {
        let mut settings = if path.exists() {
            debug!(?path, "loading settings from file");
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            debug!(?path, "settings file not found, using defaults");
            Settings::default()
        };
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DAYMARK_SERVER") {
            self.server_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Ok(level) = std::env::var("DAYMARK_LOG") {
            self.log_level = level;
        }
    }

    /// Checks that the window start is a real calendar day and that day
    /// counts are within `0..=MAX`.
    pub fn validate(&self) -> Result<()> {
        // 2000 is a leap year, so Feb 29 is accepted here.
        if NaiveDate::from_ymd_opt(2000, self.window.start_month, self.window.start_day).is_none() {
            return Err(Error::InvalidSetting(format!(
                "window start {}-{} is not a calendar day",
                self.window.start_month, self.window.start_day
            )));
        }
        if !(0..=MAX_DAYS_AHEAD).contains(&self.window.days_ahead) {
            return Err(Error::InvalidSetting(format!(
                "window.days_ahead must be between 0 and {}",
                MAX_DAYS_AHEAD
            )));
        }
        if !(0..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            return Err(Error::InvalidSetting(format!(
                "retention_days must be between 0 and {}",
                MAX_RETENTION_DAYS
            )));
        }
        Ok(())
    }
}
