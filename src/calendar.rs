use chrono::{Datelike, Days, NaiveDate};

use crate::models::{iso, Task, Workspace};

/// Number of tasks in `workspace` on `date`.
pub fn count_for(tasks: &[Task], workspace: Workspace, date: &str) -> usize {
    tasks.iter().filter(|t| t.is_on(workspace, date)).count()
}

/// Number of completed tasks in `workspace` on `date`.
pub fn completed_count_for(tasks: &[Task], workspace: Workspace, date: &str) -> usize {
    tasks
        .iter()
        .filter(|t| t.is_on(workspace, date) && t.completed)
        .count()
}

/// Maps a completion ratio to a heat level in `0..=4`.
///
/// Thresholds are inclusive upper bounds checked in ascending order:
/// - 0: no tasks
/// - 1: ratio <= 0.25 (including nothing done)
/// - 2: ratio <= 0.5
/// - 3: ratio <= 0.75
/// - 4: anything above
pub fn heat_level(count: usize, completed: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let ratio = completed as f64 / count as f64;
    if ratio <= 0.25 {
        1
    } else if ratio <= 0.5 {
        2
    } else if ratio <= 0.75 {
        3
    } else {
        4
    }
}

/// Heat level of `workspace` on `date`, read from the current collection.
pub fn heat_for(tasks: &[Task], workspace: Workspace, date: &str) -> u8 {
    heat_level(
        count_for(tasks, workspace, date),
        completed_count_for(tasks, workspace, date),
    )
}

/// Per-date aggregate used to draw one calendar cell or week tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub count: usize,
    pub completed: usize,
    pub heat: u8,
}

pub fn summarize(tasks: &[Task], workspace: Workspace, dates: &[NaiveDate]) -> Vec<DaySummary> {
    dates
        .iter()
        .map(|&date| {
            let key = iso(date);
            let count = count_for(tasks, workspace, &key);
            let completed = completed_count_for(tasks, workspace, &key);
            DaySummary {
                date,
                count,
                completed,
                heat: heat_level(count, completed),
            }
        })
        .collect()
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(date.weekday().num_days_from_sunday() as u64))
        .unwrap_or(date)
}

/// Sunday..Saturday of the week containing `date`.
pub fn week_of(date: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(date);
    (0..7).filter_map(|i| start.checked_add_days(Days::new(i))).collect()
}

/// All dates shown by a month view: from the Sunday on or before the 1st to
/// the Saturday on or after the last day. Always a multiple of seven.
pub fn month_grid(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let last = last_day_of_month(first);
    let start = week_start(first);
    let end = last
        .checked_add_days(Days::new(6 - last.weekday().num_days_from_sunday() as u64))
        .unwrap_or(last);
    std::iter::successors(Some(start), |d| d.succ_opt())
        .take_while(|d| *d <= end)
        .collect()
}

/// The day before the next month's 1st. The last representable month ends
/// on [`NaiveDate::MAX`].
fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    shift_month(first.year(), first.month(), 1)
        .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Shifts a (year, month) pair by `delta` months.
///
/// Returns `None` when the result is not a representable month.
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let index = year
        .checked_mul(12)?
        .checked_add(month as i32 - 1)?
        .checked_add(delta)?;
    let shifted = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
    NaiveDate::from_ymd_opt(shifted.0, shifted.1, 1).map(|_| shifted)
}
