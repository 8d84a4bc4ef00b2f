use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calendar dates are stored as local wall-clock `YYYY-MM-DD` strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date without going through any timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Formats a date the way tasks store it.
pub fn iso(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Formats a timestamp as an ISO 8601 UTC string with millisecond precision.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A named partition of tasks. Every count, template and materialization is
/// scoped to exactly one workspace.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workspace {
    #[default]
    #[serde(alias = "gaurav")]
    Personal,
    #[serde(alias = "nishu")]
    Work,
}

impl Workspace {
    pub const ALL: [Workspace; 2] = [Workspace::Personal, Workspace::Work];

    pub fn as_str(self) -> &'static str {
        match self {
            Workspace::Personal => "personal",
            Workspace::Work => "work",
        }
    }

    /// Resolves a persisted tag, including the two historical aliases.
    pub fn from_tag(tag: &str) -> Option<Workspace> {
        match tag {
            "personal" | "gaurav" => Some(Workspace::Personal),
            "work" | "nishu" => Some(Workspace::Work),
            _ => None,
        }
    }

    /// The other workspace.
    pub fn toggle(self) -> Workspace {
        match self {
            Workspace::Personal => Workspace::Work,
            Workspace::Work => Workspace::Personal,
        }
    }

    /// Title-cased label for display.
    pub fn label(self) -> &'static str {
        match self {
            Workspace::Personal => "Personal",
            Workspace::Work => "Work",
        }
    }
}

impl std::fmt::Display for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a single dated task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier, immutable after creation.
    pub id: String,
    /// Non-empty title.
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Local calendar date (`YYYY-MM-DD`). Kept as text so a corrupt value
    /// survives a load instead of poisoning the whole collection.
    pub date: String,
    pub workspace: Workspace,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: String,
    /// Bumped on every mutation (ISO 8601).
    #[serde(default)]
    pub last_modified: String,
}

impl Task {
    /// Creates an open task with a fresh id.
    pub fn new(title: &str, date: &str, workspace: Workspace, now: DateTime<Utc>) -> Task {
        let stamp = timestamp(now);
        Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            date: date.to_string(),
            workspace,
            created_at: stamp.clone(),
            last_modified: stamp,
        }
    }

    /// The parsed date, or `None` when the stored value is malformed.
    pub fn day(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn is_on(&self, workspace: Workspace, date: &str) -> bool {
        self.workspace == workspace && self.date == date
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = timestamp(now);
    }
}

/// A weekly recurring rule from which dated tasks are materialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DefaultTemplate {
    pub id: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    pub title: String,
    #[serde(default, alias = "tab")]
    pub workspace: Workspace,
}

pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Short weekday name for a 0 = Sunday index.
pub fn weekday_name(weekday: u8) -> &'static str {
    WEEKDAY_NAMES.get(weekday as usize).copied().unwrap_or("?")
}

/// Parses `0`..`6` or a weekday name (`mon`, `Monday`, ...).
pub fn parse_weekday(s: &str) -> Option<u8> {
    let s = s.trim().to_lowercase();
    if let Ok(n) = s.parse::<u8>() {
        return (n < 7).then_some(n);
    }
    if s.len() < 3 {
        return None;
    }
    WEEKDAY_NAMES
        .iter()
        .position(|name| s.starts_with(&name.to_lowercase()))
        .map(|i| i as u8)
}

/// Which panel the interactive view opens on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Tasks,
    Calendar,
}

/// Task list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn next(self) -> Filter {
        match self {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

/// Scalar preferences persisted across sessions.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prefs {
    #[serde(default, alias = "currentTab")]
    pub workspace: Workspace,
    #[serde(default)]
    pub view: View,
    /// Last selected date; `None` means today.
    #[serde(default)]
    pub date: Option<String>,
    /// Bearer token issued by the auth service.
    #[serde(default)]
    pub auth_token: Option<String>,
}
