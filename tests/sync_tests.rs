use chrono::NaiveDate;
use daymark::config::Settings;
use daymark::models::{Task, Workspace};
use daymark::remote::RemoteClient;
use daymark::storage::{load_tasks, LocalStore};
use daymark::sync::{Reconciliation, SyncCoordinator};
use daymark::{Error, Session};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tokio::runtime::Handle;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

fn session_for(dir: &TempDir, server: &MockServer) -> Session {
    let store = LocalStore::open(dir.path().join("tasks.json"));
    let mut session = Session::new(store, Settings::default())
        .with_today(NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
    let client = RemoteClient::new(&api(server)).unwrap();
    session.attach_sync(SyncCoordinator::new(client, Handle::current()));
    session
}

fn seed_local(dir: &TempDir) {
    fs::write(
        dir.path().join("tasks.json"),
        r#"[{"id":"local-1","title":"Local only","completed":false,"date":"2025-11-20","workspace":"personal","createdAt":"2025-11-20T08:00:00.000Z","lastModified":"2025-11-20T08:00:00.000Z"}]"#,
    )
    .unwrap();
}

async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

async fn mount_remote_tasks(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn pushed_snapshots(server: &MockServer) -> Vec<Vec<Task>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/api/sync")
        .map(|r| r.body_json::<Vec<Task>>().unwrap())
        .collect()
}

#[tokio::test]
async fn test_unreachable_remote_runs_local_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    seed_local(&dir);
    let mut session = session_for(&dir, &server);

    assert_eq!(session.reconcile().await, Reconciliation::Offline);
    assert!(!session.is_connected());

    session.add_task("Still works").unwrap();
    assert_eq!(session.sync().unwrap().push_attempts(), 0);
    assert!(session.flush_sync().await.is_empty());

    let (tasks, _) = load_tasks(&dir.path().join("tasks.json"));
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn test_failed_fetch_runs_local_only() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    seed_local(&dir);
    let mut session = session_for(&dir, &server);

    assert_eq!(session.reconcile().await, Reconciliation::Offline);
    assert!(!session.is_connected());
    assert_eq!(session.tasks()[0].id, "local-1");
}

// Remote wins wholesale: "local-1" was only ever written offline and is
// dropped without merging once a non-empty server collection is adopted.
#[tokio::test]
async fn test_non_empty_remote_replaces_local_discarding_offline_edits() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(
        &server,
        json!([
            {"id":"r1","title":"From server","completed":true,"date":"2025-11-19","workspace":"work"},
            {"id":"r2","title":"Legacy","completed":false,"date":"2025-11-20","tab":"gaurav"}
        ]),
    )
    .await;
    let dir = TempDir::new().unwrap();
    seed_local(&dir);
    let mut session = session_for(&dir, &server);

    assert_eq!(session.reconcile().await, Reconciliation::AdoptedRemote(2));
    assert!(session.is_connected());

    let ids: Vec<&str> = session.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
    assert!(session.tasks().iter().all(|t| t.id != "local-1"));
    assert_eq!(session.tasks()[1].workspace, Workspace::Personal);

    // Adopted data is durable and nothing was pushed back.
    let (on_disk, _) = load_tasks(&dir.path().join("tasks.json"));
    assert_eq!(on_disk.len(), 2);
    assert_eq!(session.sync().unwrap().push_attempts(), 0);
}

#[tokio::test]
async fn test_empty_remote_receives_local_snapshot() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    seed_local(&dir);
    let mut session = session_for(&dir, &server);
    let before = session.tasks().to_vec();

    assert_eq!(session.reconcile().await, Reconciliation::PushedLocal(1));
    assert_eq!(session.sync().unwrap().push_attempts(), 1);

    let outcomes = session.flush_sync().await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());

    assert_eq!(session.tasks(), before.as_slice());
    assert_eq!(pushed_snapshots(&server).await, vec![before]);
}

#[tokio::test]
async fn test_both_empty_is_a_no_op() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(&server, json!([])).await;
    let dir = TempDir::new().unwrap();
    let mut session = session_for(&dir, &server);

    assert_eq!(session.reconcile().await, Reconciliation::BothEmpty);
    assert!(session.is_connected());
    assert_eq!(session.sync().unwrap().push_attempts(), 0);
    assert!(session.tasks().is_empty());
    assert!(pushed_snapshots(&server).await.is_empty());
}

#[tokio::test]
async fn test_mutation_after_connect_pushes_full_collection() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut session = session_for(&dir, &server);
    session.reconcile().await;

    let task = session.add_task("Ship it").unwrap();
    session.toggle_task(&task.id).unwrap();
    assert_eq!(session.sync().unwrap().push_attempts(), 2);

    let outcomes = session.flush_sync().await;
    assert!(outcomes.iter().all(|r| r.is_ok()));

    let snapshots = pushed_snapshots(&server).await;
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|s| s.len() == 1 && s[0].title == "Ship it"));
}

#[tokio::test]
async fn test_failed_push_keeps_local_change() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut session = session_for(&dir, &server);
    session.reconcile().await;

    session.add_task("Survives").unwrap();
    let outcomes = session.flush_sync().await;
    assert!(matches!(
        outcomes.as_slice(),
        [Err(Error::Status { status: 500, .. })]
    ));

    let (tasks, _) = load_tasks(&dir.path().join("tasks.json"));
    assert_eq!(tasks[0].title, "Survives");
}

#[tokio::test]
async fn test_stored_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    mount_ping(&server).await;
    mount_remote_tasks(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut session = session_for(&dir, &server);
    session.set_auth_token(Some("secret-token".into())).unwrap();
    session.reconcile().await;

    session.add_task("Authed").unwrap();
    let outcomes = session.flush_sync().await;
    assert!(outcomes[0].is_ok());
}

#[tokio::test]
async fn test_fetch_by_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("date", "2025-11-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id":"r1","title":"Dated","completed":false,"date":"2025-11-10","workspace":"work"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteClient::new(&api(&server)).unwrap();
    let tasks = client.fetch_tasks(Some("2025-11-10")).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].workspace, Workspace::Work);
}

#[tokio::test]
async fn test_auth_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "taken"})))
        .mount(&server)
        .await;

    let client = RemoteClient::new(&api(&server)).unwrap();
    assert!(client.users_exist().await.unwrap());
    assert_eq!(client.login("me", "pw").await.unwrap(), "abc");
    assert!(matches!(
        client.register("me", "pw").await,
        Err(Error::Status { status: 400, .. })
    ));
}
