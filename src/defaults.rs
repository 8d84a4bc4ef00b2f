//! Materialization of weekly default templates into dated tasks.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::WindowSettings;
use crate::models::{iso, parse_date, DefaultTemplate, Task, Workspace};

/// Inclusive date range inside which templates may be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MaterializationWindow {
    /// Window for `today`: from the configured day of the current year up to
    /// `today + days_ahead`.
    ///
    /// Returns `None` when the configured start does not exist this year
    /// (Feb 29 outside a leap year). An end past the calendar's range is
    /// clamped to [`NaiveDate::MAX`].
    pub fn for_today(today: NaiveDate, settings: &WindowSettings) -> Option<MaterializationWindow> {
        let start = NaiveDate::from_ymd_opt(today.year(), settings.start_month, settings.start_day)?;
        let end = Duration::try_days(settings.days_ahead)
            .and_then(|ahead| today.checked_add_signed(ahead))
            .unwrap_or(NaiveDate::MAX);
        Some(MaterializationWindow { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Inserts the missing instances of every template matching `date` and
/// `workspace`. Returns how many tasks were created.
///
/// A template is considered already present when a task with the same
/// `(workspace, date, title)` exists, so repeated calls are no-ops. Dates
/// that don't parse or fall outside `window` never produce tasks.
pub fn materialize(
    tasks: &mut Vec<Task>,
    templates: &[DefaultTemplate],
    date: &str,
    workspace: Workspace,
    window: Option<&MaterializationWindow>,
    now: DateTime<Utc>,
) -> usize {
    let Some(day) = parse_date(date) else {
        debug!(date, "skipping defaults for unparseable date");
        return 0;
    };
    let Some(window) = window else {
        warn!("materialization window start is not a valid date this year");
        return 0;
    };
    if !window.contains(day) {
        return 0;
    }
    // Normalize so "2025-11-3"-style input matches stored dates.
    let date = iso(day);
    let weekday = day.weekday().num_days_from_sunday() as u8;

    let mut created = 0;
    for template in templates {
        if template.weekday != weekday || template.workspace != workspace {
            continue;
        }
        let exists = tasks
            .iter()
            .any(|t| t.is_on(workspace, &date) && t.title == template.title);
        if !exists {
            tasks.insert(0, Task::new(&template.title, &date, workspace, now));
            created += 1;
        }
    }
    if created > 0 {
        debug!(%date, %workspace, created, "materialized defaults");
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn window_spans_nov_first_to_thirty_days_ahead() {
        let w = MaterializationWindow::for_today(day("2025-11-20"), &WindowSettings::default()).unwrap();
        assert_eq!(w.start, day("2025-11-01"));
        assert_eq!(w.end, day("2025-12-20"));
        assert!(w.contains(day("2025-11-01")));
        assert!(w.contains(day("2025-12-20")));
        assert!(!w.contains(day("2025-10-31")));
        assert!(!w.contains(day("2025-12-21")));
    }

    #[test]
    fn window_is_empty_before_start_day_of_year() {
        // On Oct 1 the window runs Nov 1 .. Oct 31, which contains nothing.
        let w = MaterializationWindow::for_today(day("2025-10-01"), &WindowSettings::default()).unwrap();
        assert!(!w.contains(day("2025-10-15")));
        assert!(!w.contains(day("2025-11-01")));
    }

    #[test]
    fn leap_day_start_outside_leap_year_has_no_window() {
        let settings = WindowSettings {
            start_month: 2,
            start_day: 29,
            days_ahead: 30,
        };
        assert!(MaterializationWindow::for_today(day("2025-03-01"), &settings).is_none());
    }

    #[test]
    fn oversized_days_ahead_clamps_to_calendar_end() {
        let settings = WindowSettings {
            start_month: 11,
            start_day: 1,
            days_ahead: i64::MAX,
        };
        let w = MaterializationWindow::for_today(day("2025-11-20"), &settings).unwrap();
        assert_eq!(w.end, NaiveDate::MAX);
        assert!(w.contains(day("9999-12-31")));
    }
}
