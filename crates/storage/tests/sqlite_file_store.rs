use shared::{AppFields, LaunchStatus};
use storage::{LiveQuery, RecordStore, SqliteRecordStore};

fn dated(name: &str, created_at: i64) -> AppFields {
    AppFields {
        name: name.to_string(),
        tagline: Some("tagline".into()),
        description: Some(String::new()),
        launch_status: LaunchStatus::ComingOnDate,
        launch_date: Some("2026-12-01".into()),
        launch_weeks: None,
        external_link: Some("https://example.com".into()),
        created_at,
    }
}

#[tokio::test]
async fn records_survive_reopening_the_database_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("records.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let id = {
        let store = SqliteRecordStore::new(&database_url).await.expect("open");
        store.create("apps", &dated("Persisted", 7)).await.expect("create")
    };
    assert!(db_path.exists(), "database file should be created");

    let reopened = SqliteRecordStore::new(&database_url).await.expect("reopen");
    let feed = reopened
        .subscribe(&LiveQuery::newest_first("apps"))
        .await
        .expect("subscribe");
    let snapshot = feed.latest().expect("loaded");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].launch_date.as_deref(), Some("2026-12-01"));
    assert_eq!(snapshot[0].external_link.as_deref(), Some("https://example.com"));
}
