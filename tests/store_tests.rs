use daymark::models::Workspace;
use daymark::storage::{load_prefs, load_tasks, load_templates, save_tasks, LocalStore};
use std::fs;
use tempfile::TempDir;

fn store_with(dir: &TempDir, contents: &str) -> LocalStore {
    let path = dir.path().join("tasks.json");
    fs::write(&path, contents).unwrap();
    LocalStore::open(path)
}

#[test]
fn test_legacy_tab_is_migrated_and_persisted() {
    let dir = TempDir::new().unwrap();
    let store = store_with(
        &dir,
        r#"[
            {"id":"a","title":"Groceries","completed":false,"date":"2025-11-10","tab":"gaurav"},
            {"id":"b","title":"Review","completed":true,"date":"2025-11-10","tab":"nishu"}
        ]"#,
    );

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].workspace, Workspace::Personal);
    assert_eq!(tasks[1].workspace, Workspace::Work);
    assert!(!tasks[0].created_at.is_empty());
    assert_eq!(tasks[0].last_modified, tasks[0].created_at);

    let on_disk = fs::read_to_string(store.path()).unwrap();
    assert!(!on_disk.contains("\"tab\""));
    assert!(on_disk.contains("\"workspace\": \"personal\""));
    assert!(on_disk.contains("\"workspace\": \"work\""));
}

#[test]
fn test_second_load_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with(
        &dir,
        r#"[{"id":"a","title":"Groceries","completed":false,"date":"2025-11-10","tab":"gaurav"}]"#,
    );
    let first = store.tasks().to_vec();

    assert!(!store.reload());
    assert_eq!(store.tasks(), first.as_slice());
}

#[test]
fn test_missing_date_gets_a_date_and_unknown_tag_defaults() {
    let dir = TempDir::new().unwrap();
    let store = store_with(
        &dir,
        r#"[{"id":"a","title":"Loose","completed":false,"workspace":"mystery"}]"#,
    );

    let task = &store.tasks()[0];
    assert_eq!(task.workspace, Workspace::Personal);
    assert!(task.day().is_some());
}

#[test]
fn test_malformed_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, "{ this is not json");
    assert!(store.tasks().is_empty());
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path().join("nested").join("tasks.json"));
    assert!(store.tasks().is_empty());
}

#[test]
fn test_malformed_record_is_dropped() {
    let dir = TempDir::new().unwrap();
    let store = store_with(
        &dir,
        r#"[
            {"id":"a","title":"Kept","completed":false,"date":"2025-11-10","workspace":"work"},
            {"title":"No id","completed":"yes"}
        ]"#,
    );
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].title, "Kept");
}

#[test]
fn test_tasks_for_filters_by_workspace_and_date() {
    let dir = TempDir::new().unwrap();
    let store = store_with(
        &dir,
        r#"[
            {"id":"a","title":"A","completed":false,"date":"2025-11-10","workspace":"work"},
            {"id":"b","title":"B","completed":false,"date":"2025-11-10","workspace":"personal"},
            {"id":"c","title":"C","completed":false,"date":"2025-11-11","workspace":"work"}
        ]"#,
    );

    let ids: Vec<&str> = store
        .tasks_for(Workspace::Work, "2025-11-10")
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a"]);
    assert_eq!(store.tasks_in(Workspace::Work).count(), 2);
}

#[test]
fn test_delete_database_removes_sibling_files() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with(
        &dir,
        r#"[{"id":"a","title":"A","completed":false,"date":"2025-11-10","workspace":"work"}]"#,
    );
    fs::write(store.templates_path(), "[]").unwrap();
    fs::write(store.prefs_path(), "{}").unwrap();

    store.delete_database().unwrap();

    assert!(store.tasks().is_empty());
    assert!(!store.path().exists());
    assert!(!store.templates_path().exists());
    assert!(!store.prefs_path().exists());
}

#[test]
fn test_legacy_template_and_prefs_keys() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("defaults.json"),
        r#"[{"id":"t1","weekday":1,"title":"Standup","tab":"nishu"}]"#,
    )
    .unwrap();
    fs::write(dir.path().join("prefs.json"), r#"{"currentTab":"nishu"}"#).unwrap();

    let templates = load_templates(&dir.path().join("defaults.json"));
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].workspace, Workspace::Work);

    let prefs = load_prefs(&dir.path().join("prefs.json"));
    assert_eq!(prefs.workspace, Workspace::Work);
}

#[test]
fn test_shrinking_rewrite_replaces_file_whole() {
    let dir = TempDir::new().unwrap();
    let long: Vec<String> = (0..50)
        .map(|i| format!(r#"{{"id":"t{i}","title":"A fairly long title number {i}","completed":false,"date":"2025-11-10","workspace":"work"}}"#))
        .collect();
    let mut store = store_with(&dir, &format!("[{}]", long.join(",")));
    assert_eq!(store.tasks().len(), 50);

    let keep = store.tasks()[0].clone();
    store.replace(vec![keep.clone()]).unwrap();

    let on_disk = fs::read_to_string(store.path()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    assert_eq!(load_tasks(store.path()).0, vec![keep]);

    // No temp files are left behind next to the data file.
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tasks.json"]);
}

#[test]
fn test_save_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("tasks.json");

    save_tasks(&path, &[]).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
}
