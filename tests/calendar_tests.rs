use chrono::NaiveDate;
use daymark::calendar::heat_level;
use daymark::config::Settings;
use daymark::models::Workspace;
use daymark::storage::LocalStore;
use daymark::Session;
use std::fs;
use tempfile::TempDir;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn session_with(dir: &TempDir, json: &str) -> Session {
    let path = dir.path().join("tasks.json");
    fs::write(&path, json).unwrap();
    Session::new(LocalStore::open(path), Settings::default()).with_today(day("2025-11-20"))
}

#[test]
fn test_heat_for_four_tasks() {
    assert_eq!(heat_level(4, 0), 1);
    assert_eq!(heat_level(4, 1), 1);
    assert_eq!(heat_level(4, 2), 2);
    assert_eq!(heat_level(4, 3), 3);
    assert_eq!(heat_level(4, 4), 4);
}

#[test]
fn test_heat_is_zero_without_tasks() {
    assert_eq!(heat_level(0, 0), 0);
}

#[test]
fn test_heat_is_monotonic() {
    for count in 1..=12 {
        let mut last = 0;
        for completed in 0..=count {
            let level = heat_level(count, completed);
            assert!((1..=4).contains(&level));
            assert!(level >= last, "count={} completed={}", count, completed);
            last = level;
        }
    }
}

#[test]
fn test_counts_are_per_workspace() {
    let dir = TempDir::new().unwrap();
    let session = session_with(
        &dir,
        r#"[
            {"id":"a","title":"A","completed":true,"date":"2025-11-10","workspace":"work"},
            {"id":"b","title":"B","completed":false,"date":"2025-11-10","workspace":"work"},
            {"id":"c","title":"C","completed":true,"date":"2025-11-10","workspace":"personal"}
        ]"#,
    );

    assert_eq!(session.count_for(Workspace::Work, "2025-11-10"), 2);
    assert_eq!(session.completed_count_for(Workspace::Work, "2025-11-10"), 1);
    assert_eq!(session.heat_level(Workspace::Work, "2025-11-10"), 2);

    assert_eq!(session.count_for(Workspace::Personal, "2025-11-10"), 1);
    assert_eq!(session.heat_level(Workspace::Personal, "2025-11-10"), 4);

    assert_eq!(session.heat_level(Workspace::Work, "2025-11-11"), 0);
}

#[test]
fn test_week_summary_runs_sunday_to_saturday() {
    let dir = TempDir::new().unwrap();
    let mut session = session_with(
        &dir,
        r#"[{"id":"a","title":"A","completed":false,"date":"2025-11-05","workspace":"personal"}]"#,
    );

    let week = session.week_summary(day("2025-11-05"));
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].date, day("2025-11-02"));
    assert_eq!(week[6].date, day("2025-11-08"));
    assert_eq!(week[3].count, 1);
    assert_eq!(week[3].heat, 1);
}

#[test]
fn test_work_edits_leave_personal_heat_untouched() {
    let dir = TempDir::new().unwrap();
    let mut session = session_with(
        &dir,
        r#"[
            {"id":"p1","title":"Gym","completed":true,"date":"2025-11-10","workspace":"personal"},
            {"id":"p2","title":"Read","completed":false,"date":"2025-11-10","workspace":"personal"}
        ]"#,
    );
    let personal = |s: &Session| {
        (
            s.count_for(Workspace::Personal, "2025-11-10"),
            s.completed_count_for(Workspace::Personal, "2025-11-10"),
            s.heat_level(Workspace::Personal, "2025-11-10"),
        )
    };
    let before = personal(&session);
    assert_eq!(before, (2, 1, 2));

    session.switch_workspace(Workspace::Work).unwrap();
    session.select_date("2025-11-10").unwrap();
    let first = session.add_task("Deploy").unwrap();
    let second = session.add_task("Review").unwrap();
    assert_eq!(personal(&session), before);

    assert!(session.toggle_task(&first.id).unwrap());
    assert!(session.toggle_task(&second.id).unwrap());
    assert_eq!(session.completed_count_for(Workspace::Work, "2025-11-10"), 2);
    assert_eq!(session.heat_level(Workspace::Work, "2025-11-10"), 4);
    assert_eq!(personal(&session), before);

    session.delete_task(&first.id).unwrap();
    session.clear_completed().unwrap();
    assert_eq!(session.count_for(Workspace::Work, "2025-11-10"), 0);
    assert_eq!(personal(&session), before);
}
