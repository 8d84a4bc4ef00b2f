use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::models::Task;

/// Drops tasks dated `retention_days` or more days before `today`.
///
/// Tasks whose date doesn't parse are kept, and a cutoff before the start of
/// the calendar purges nothing. Returns whether anything was removed, so
/// callers only re-persist when needed.
pub fn sweep(tasks: &mut Vec<Task>, today: NaiveDate, retention_days: i64) -> bool {
    let Some(cutoff) = Duration::try_days(retention_days).and_then(|d| today.checked_sub_signed(d)) else {
        return false;
    };
    let before = tasks.len();
    tasks.retain(|t| t.day().map_or(true, |d| d > cutoff));
    let removed = before - tasks.len();
    if removed > 0 {
        info!(removed, %cutoff, "retention sweep purged old tasks");
    }
    removed > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{iso, parse_date, Workspace};
    use chrono::Utc;

    fn task_on(date: &str) -> Task {
        Task::new("old", date, Workspace::Personal, Utc::now())
    }

    #[test]
    fn boundary_days() {
        let today = parse_date("2025-11-15").unwrap();
        let mut tasks = vec![
            task_on(&iso(today - Duration::days(366))),
            task_on(&iso(today - Duration::days(365))),
            task_on(&iso(today - Duration::days(364))),
            task_on("not-a-date"),
        ];
        assert!(sweep(&mut tasks, today, 365));
        let dates: Vec<&str> = tasks.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec![iso(today - Duration::days(364)).as_str(), "not-a-date"]);
    }

    #[test]
    fn huge_retention_purges_nothing() {
        let today = parse_date("2025-11-15").unwrap();
        let mut tasks = vec![task_on("1900-01-01"), task_on("2025-11-14")];
        assert!(!sweep(&mut tasks, today, i64::MAX));
        assert!(!sweep(&mut tasks, today, 1_000_000_000));
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn nothing_to_purge_reports_false() {
        let today = parse_date("2025-11-15").unwrap();
        let mut tasks = vec![task_on("2025-11-14")];
        assert!(!sweep(&mut tasks, today, 365));
        assert_eq!(tasks.len(), 1);
    }
}
