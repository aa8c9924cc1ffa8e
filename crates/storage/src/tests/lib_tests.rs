use super::*;
use shared::{LaunchStatus, StoreErrorCode};
use std::time::Duration;

const APPS: &str = "apps";

fn fields(name: &str, created_at: i64) -> AppFields {
    AppFields {
        name: name.to_string(),
        tagline: Some(String::new()),
        description: Some(String::new()),
        launch_status: LaunchStatus::ComingSoon,
        launch_date: None,
        launch_weeks: None,
        external_link: None,
        created_at,
    }
}

fn names(snapshot: &Snapshot) -> Vec<&str> {
    snapshot.iter().map(|record| record.name.as_str()).collect()
}

#[tokio::test]
async fn memory_feed_starts_with_loaded_empty_snapshot() {
    let store = MemoryRecordStore::new();
    let feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    let snapshot = feed.latest().expect("initial snapshot is loaded");
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn memory_feed_emits_full_list_newest_first_after_each_write() {
    let store = MemoryRecordStore::new();
    let mut feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");

    store.create(APPS, &fields("older", 10)).await.expect("create");
    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(names(&snapshot), vec!["older"]);

    store.create(APPS, &fields("newer", 20)).await.expect("create");
    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(names(&snapshot), vec!["newer", "older"]);
}

#[tokio::test]
async fn memory_update_keeps_id_and_replaces_fields() {
    let store = MemoryRecordStore::new();
    let id = store.create(APPS, &fields("Ludo", 1000)).await.expect("create");

    let mut changed = fields("Ludo", 1000);
    changed.tagline = Some("Roll the dice".into());
    store.update(APPS, &id, &changed).await.expect("update");

    let records = store.records(APPS);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].created_at, 1000);
    assert_eq!(records[0].tagline.as_deref(), Some("Roll the dice"));
}

#[tokio::test]
async fn memory_update_and_delete_of_unknown_id_fail_with_not_found() {
    let store = MemoryRecordStore::new();
    let missing = RecordId::from("missing");

    let err = store
        .update(APPS, &missing, &fields("x", 1))
        .await
        .expect_err("update must fail");
    assert_eq!(err.code, StoreErrorCode::NotFound);

    let err = store.delete(APPS, &missing).await.expect_err("delete must fail");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[tokio::test]
async fn memory_delete_removes_record_from_next_snapshot() {
    let store = MemoryRecordStore::new();
    let keep = store.create(APPS, &fields("keep", 1)).await.expect("create");
    let drop_id = store.create(APPS, &fields("drop", 2)).await.expect("create");

    let mut feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    store.delete(APPS, &drop_id).await.expect("delete");

    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, keep);
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = MemoryRecordStore::new();
    store.create("drafts", &fields("draft", 1)).await.expect("create");

    let feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    assert!(feed.latest().expect("loaded").is_empty());
}

#[tokio::test]
async fn rejects_unsupported_ordering() {
    let store = MemoryRecordStore::new();
    let query = LiveQuery {
        collection: APPS.into(),
        order_by: "name".into(),
        descending: false,
    };
    let err = store.subscribe(&query).await.expect_err("must reject");
    assert_eq!(err.code, StoreErrorCode::InvalidQuery);
}

#[tokio::test]
async fn feed_stream_yields_current_snapshot_then_changes() {
    let store = MemoryRecordStore::new();
    store.create(APPS, &fields("first", 1)).await.expect("create");
    let feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    let mut stream = feed.into_stream();

    let initial = stream.next().await.expect("initial");
    assert_eq!(names(&initial), vec!["first"]);

    store.create(APPS, &fields("second", 2)).await.expect("create");
    let next = stream.next().await.expect("next");
    assert_eq!(names(&next), vec!["second", "first"]);
}

#[tokio::test]
async fn seeded_records_keep_their_id_and_created_at() {
    let store = MemoryRecordStore::new();
    store.seed(
        APPS,
        AppRecord::from_fields(RecordId::from("abc"), fields("Seeded", 1000)),
    );
    let records = store.records(APPS);
    assert_eq!(records[0].id, RecordId::from("abc"));
    assert_eq!(records[0].created_at, 1000);
}

#[tokio::test]
async fn sqlite_store_round_trips_documents_and_feeds_snapshots() {
    let store = SqliteRecordStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health");

    let mut feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    assert!(feed.latest().expect("loaded").is_empty());

    let mut weekly = fields("Ludo Supreme", 50);
    weekly.launch_status = LaunchStatus::ComingInWeeks;
    weekly.launch_weeks = Some(3);
    let id = store.create(APPS, &weekly).await.expect("create");

    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].launch_weeks, Some(3));
    assert_eq!(snapshot[0].launch_date, None);

    store.create(APPS, &fields("Newest", 60)).await.expect("create");
    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(names(&snapshot), vec!["Newest", "Ludo Supreme"]);

    store.delete(APPS, &id).await.expect("delete");
    let snapshot = feed.changed().await.expect("changed").expect("loaded");
    assert_eq!(names(&snapshot), vec!["Newest"]);
}

#[tokio::test]
async fn sqlite_update_of_unknown_id_fails_with_not_found() {
    let store = SqliteRecordStore::new("sqlite::memory:").await.expect("db");
    let err = store
        .update(APPS, &RecordId::from("nope"), &fields("x", 1))
        .await
        .expect_err("must fail");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[tokio::test]
async fn sqlite_skips_malformed_documents() {
    let store = SqliteRecordStore::new("sqlite::memory:").await.expect("db");
    sqlx::query("INSERT INTO documents (collection, id, created_at, body) VALUES (?, ?, ?, ?)")
        .bind(APPS)
        .bind("broken")
        .bind(5_i64)
        .bind("{not json")
        .execute(store.pool())
        .await
        .expect("raw insert");
    store.create(APPS, &fields("ok", 1)).await.expect("create");

    let feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    assert_eq!(names(&feed.latest().expect("loaded")), vec!["ok"]);
}

async fn stored_count(store: &SqliteRecordStore) -> usize {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
        .bind(APPS)
        .fetch_one(store.pool())
        .await
        .expect("count");
    usize::try_from(count).expect("non-negative count")
}

#[tokio::test]
async fn sqlite_feeds_match_the_database_after_cancelled_writes() {
    let store = SqliteRecordStore::new("sqlite::memory:").await.expect("db");
    let long_lived = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");

    for attempt in 1..=400_u64 {
        let racy = fields("racy", attempt as i64);
        let write = store.create(APPS, &racy);
        let _ = tokio::time::timeout(Duration::from_micros(attempt * 5), write).await;

        let fresh = store
            .subscribe(&LiveQuery::newest_first(APPS))
            .await
            .expect("subscribe");
        let stored = stored_count(&store).await;
        assert_eq!(
            fresh.latest().expect("loaded").len(),
            stored,
            "new subscriber after attempt {attempt}"
        );
        assert_eq!(
            long_lived.latest().expect("loaded").len(),
            stored,
            "existing subscriber after attempt {attempt}"
        );
    }
}

#[tokio::test]
async fn sqlite_write_whose_reload_fails_commits_nothing() {
    let store = SqliteRecordStore::new("sqlite::memory:").await.expect("db");
    let feed = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    // A blob id cannot be read back as text, so the reload after the insert fails.
    sqlx::query(
        "CREATE TRIGGER unreadable_sibling AFTER INSERT ON documents
         BEGIN
           INSERT INTO documents (collection, id, created_at, body)
           VALUES (NEW.collection, X'00', 0, '{}');
         END",
    )
    .execute(store.pool())
    .await
    .expect("trigger");

    let err = store
        .create(APPS, &fields("Ludo", 1))
        .await
        .expect_err("reload must fail");
    assert_eq!(err.code, StoreErrorCode::Internal);
    assert_eq!(stored_count(&store).await, 0);
    assert!(feed.latest().expect("loaded").is_empty());

    sqlx::query("DROP TRIGGER unreadable_sibling")
        .execute(store.pool())
        .await
        .expect("drop trigger");
    store.create(APPS, &fields("Ludo", 1)).await.expect("create");
    assert_eq!(stored_count(&store).await, 1);
    assert_eq!(names(&feed.latest().expect("loaded")), vec!["Ludo"]);
}

#[tokio::test]
async fn memory_subscribe_refreshes_existing_feeds_only_on_change() {
    let store = MemoryRecordStore::new();
    let mut first = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    first.current();

    let _second = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    assert_eq!(store.subscriber_count(APPS), 2);

    store.create(APPS, &fields("Ludo", 1)).await.expect("create");
    let snapshot = first.changed().await.expect("changed").expect("loaded");
    assert_eq!(names(&snapshot), vec!["Ludo"]);

    let third = store
        .subscribe(&LiveQuery::newest_first(APPS))
        .await
        .expect("subscribe");
    assert_eq!(names(&third.latest().expect("loaded")), vec!["Ludo"]);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), first.changed())
            .await
            .is_err(),
        "an unchanged refresh must not wake existing feeds"
    );
    drop(third);
    assert_eq!(store.subscriber_count(APPS), 2);
}
