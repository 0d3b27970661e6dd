// tests/store_persistence.rs
use chrono::NaiveDate;
use community_alerts::fingerprint::Fingerprint;
use community_alerts::{ChatId, FeedKind, PersistedState, Store};

#[tokio::test]
async fn first_run_creates_empty_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("db.json");

    let store = Store::open(&path).await.expect("missing file is not an error");
    assert!(path.exists(), "state file should be created on first run");
    assert_eq!(store.snapshot().await, PersistedState::default());
}

#[tokio::test]
async fn corrupt_state_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Store::open(&path).await.expect_err("corrupt file must not load");
    assert!(format!("{err:#}").contains("corrupt"), "{err:#}");
    // and the file is left alone
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[tokio::test]
async fn mark_seen_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("db.json")).await.unwrap();
    let fp = Fingerprint::new("Build a Widget_2025-01-01");

    assert!(store.mark_seen(FeedKind::Bounties, &fp).await.unwrap());
    assert!(!store.mark_seen(FeedKind::Bounties, &fp).await.unwrap());
    assert!(store.contains(FeedKind::Bounties, &fp).await);
    assert!(!store.contains(FeedKind::Events, &fp).await, "feeds are independent");
    assert_eq!(store.snapshot().await.seen_bounties.len(), 1);
}

#[tokio::test]
async fn every_mutation_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    {
        let store = Store::open(&path).await.unwrap();
        store.add_subscriber(ChatId(11)).await.unwrap();
        store.add_subscriber(ChatId(12)).await.unwrap();
        store.remove_subscriber(ChatId(12)).await.unwrap();
        store
            .mark_seen(FeedKind::Events, &Fingerprint::new("Talent Hub_2025-03-07 17:00"))
            .await
            .unwrap();
        store
            .set_last_digest_date(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())
            .await
            .unwrap();
    }

    let reopened = Store::open(&path).await.unwrap();
    let st = reopened.snapshot().await;
    assert_eq!(st.subscribers.into_iter().collect::<Vec<_>>(), vec![ChatId(11)]);
    assert!(st.seen_events.contains("Talent Hub_2025-03-07 17:00"));
    assert_eq!(st.last_digest_date, NaiveDate::from_ymd_opt(2025, 3, 7));
    assert!(!path.with_extension("json.tmp").exists(), "temp file renamed away");
}

#[tokio::test]
async fn loads_state_written_by_older_deployments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(
        &path,
        r#"{
  "subscribers": [123456789],
  "seen_bounties": ["Old bounty_None"],
  "seen_events": [],
  "last_digest_date": "2025-09-06"
}"#,
    )
    .unwrap();

    let store = Store::open(&path).await.unwrap();
    assert!(store.is_subscribed(ChatId(123_456_789)).await);
    assert!(
        store
            .contains(FeedKind::Bounties, &Fingerprint::new("Old bounty_None"))
            .await
    );
    assert_eq!(store.last_digest_date().await, NaiveDate::from_ymd_opt(2025, 9, 6));
}

#[tokio::test]
async fn concurrent_mutations_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let store = std::sync::Arc::new(Store::open(&path).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..20i64 {
        let s = store.clone();
        tasks.push(tokio::spawn(async move {
            s.add_subscriber(ChatId(i)).await.unwrap();
            s.mark_seen(FeedKind::Bounties, &Fingerprint::new(format!("b{i}")))
                .await
                .unwrap();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let on_disk: PersistedState =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.subscribers.len(), 20);
    assert_eq!(on_disk.seen_bounties.len(), 20);
    assert_eq!(on_disk, store.snapshot().await);
}
