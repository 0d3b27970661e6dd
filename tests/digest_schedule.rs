// tests/digest_schedule.rs
mod common;

use chrono::{NaiveTime, TimeZone};
use chrono_tz::Europe::Dublin;
use common::{bounty, event, harness, GROUP};
use community_alerts::feeds::types::FeedResult;
use community_alerts::scheduler::spawn_digest_loop_with;
use community_alerts::ChatId;

fn eight() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap()
}

#[tokio::test]
async fn fires_once_at_target_minute() {
    let h = harness(
        FeedResult::Items(vec![bounty("Build a Widget", Some("2025-01-01"))]),
        FeedResult::Items(vec![event("Talent Hub", "2025-03-07 17:00")]),
    )
    .await;
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    let at = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 5).unwrap();
    assert!(sched.tick(at).await.unwrap());
    assert_eq!(h.store.last_digest_date().await, Some(at.date_naive()));

    // Next tick within the same minute does nothing.
    let later = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 35).unwrap();
    assert!(!sched.tick(later).await.unwrap());

    let sent = h.sender.sent_to(GROUP);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("Good morning, builders."));
    assert!(sent[0].contains("Daily Brief"));
    assert!(sent[0].contains("Talent Hub"));
    assert!(sent[0].contains("Build a Widget"));
}

#[tokio::test]
async fn already_sent_today_does_not_redeliver() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let at = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 0).unwrap();
    h.store.set_last_digest_date(at.date_naive()).await.unwrap();

    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);
    assert!(!sched.tick(at).await.unwrap());
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn yesterday_allows_todays_digest() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let yesterday = Dublin.with_ymd_and_hms(2025, 3, 6, 8, 0, 0).unwrap();
    h.store.set_last_digest_date(yesterday.date_naive()).await.unwrap();

    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);
    let today = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 0).unwrap();
    assert!(sched.tick(today).await.unwrap());
    assert_eq!(h.sender.sent_to(GROUP).len(), 1);
    assert_eq!(h.store.last_digest_date().await, Some(today.date_naive()));
}

#[tokio::test]
async fn off_target_minutes_do_not_fire() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    for (hh, mm) in [(7, 59), (8, 1), (20, 0)] {
        let t = Dublin.with_ymd_and_hms(2025, 3, 7, hh, mm, 0).unwrap();
        assert!(!sched.tick(t).await.unwrap(), "{hh}:{mm}");
    }
    assert!(h.sender.sent().is_empty());
    assert_eq!(h.store.last_digest_date().await, None);
}

#[tokio::test]
async fn target_is_local_time_not_utc() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    // 08:00 Dublin summer time is 07:00 UTC.
    let utc = chrono::Utc.with_ymd_and_hms(2025, 7, 1, 7, 0, 0).unwrap();
    assert!(sched.tick(utc.with_timezone(&Dublin)).await.unwrap());
}

#[tokio::test]
async fn failed_delivery_still_closes_the_day() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    h.sender.fail_for(GROUP);
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    let at = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 0).unwrap();
    assert!(sched.tick(at).await.unwrap());
    assert_eq!(h.store.last_digest_date().await, Some(at.date_naive()));
}

#[tokio::test]
async fn empty_feeds_use_none_text() {
    let h = harness(FeedResult::Empty, FeedResult::Unavailable("down".into())).await;
    let text = h.service.compose_digest().await;
    assert!(text.contains("The event calendar is unavailable right now."));
    assert!(text.contains("No open bounties right now. Check back later!"));
    assert!(!text.contains("down"), "internal reasons never reach users");
}

#[tokio::test]
async fn manual_digest_ignores_daily_guard() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let today = chrono::Utc::now().date_naive();
    h.store.set_last_digest_date(today).await.unwrap();

    h.service.send_digest_now(ChatId(55)).await.unwrap();
    h.service.send_digest_now(ChatId(55)).await.unwrap();
    assert_eq!(h.sender.sent_to(ChatId(55)).len(), 2);
    assert_eq!(h.store.last_digest_date().await, Some(today));
}

#[tokio::test]
async fn digest_lists_at_most_five_bounties() {
    let many = (1..=8).map(|i| bounty(&format!("Bounty {i}"), None)).collect();
    let h = harness(FeedResult::Items(many), FeedResult::Empty).await;
    let text = h.service.compose_digest().await;
    assert!(text.contains("Bounty 5"));
    assert!(!text.contains("Bounty 6"));
    assert!(text.contains("No upcoming events yet."));
}

#[tokio::test]
async fn unpersisted_date_still_blocks_second_send() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    // Block the temp file path with a directory so every persist fails.
    std::fs::create_dir(h.store.path().with_extension("json.tmp")).unwrap();

    let first = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 5).unwrap();
    assert!(sched.tick(first).await.is_err(), "persist failure is reported");
    assert_eq!(h.store.last_digest_date().await, None);

    let second = Dublin.with_ymd_and_hms(2025, 3, 7, 8, 0, 35).unwrap();
    assert!(!sched.tick(second).await.unwrap());
    assert_eq!(h.sender.sent_to(GROUP).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn digest_loop_fires_once_across_target_minute() {
    let h = harness(FeedResult::Empty, FeedResult::Empty).await;
    let sched = h.service.digest_scheduler(eight(), Dublin, GROUP);

    // Virtual wall clock starting at 07:58 Dublin, driven by tokio's paused time.
    let base = Dublin
        .with_ymd_and_hms(2025, 3, 7, 7, 58, 0)
        .unwrap()
        .with_timezone(&chrono::Utc);
    let started = tokio::time::Instant::now();
    let clock = move || base + chrono::Duration::from_std(started.elapsed()).unwrap();

    let handle = spawn_digest_loop_with(sched, clock);

    tokio::time::sleep(std::time::Duration::from_secs(90)).await;
    assert!(h.sender.sent().is_empty(), "07:59:30 is too early");

    tokio::time::sleep(std::time::Duration::from_secs(5 * 60)).await;
    assert_eq!(h.sender.sent_to(GROUP).len(), 1);
    assert_eq!(
        h.store.last_digest_date().await,
        Some(chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())
    );

    handle.abort();
}
