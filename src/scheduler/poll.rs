// src/scheduler/poll.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::change_detector::detect_new;
use crate::feeds::types::{BountyFeed, EventFeed, FeedResult};
use crate::fingerprint::Fingerprinted;
use crate::messages;
use crate::notify::Notifier;
use crate::store::{FeedKind, Store};

/// What one feed check did during a poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedCycle {
    pub fetched: usize,
    pub fresh: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Set when the feed was unavailable or processing failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub bounties: FeedCycle,
    pub events: FeedCycle,
}

/// Fetch -> detect -> announce, for both feeds.
#[derive(Clone)]
pub struct AlertPipeline {
    store: Arc<Store>,
    bounties: Arc<dyn BountyFeed>,
    events: Arc<dyn EventFeed>,
    notifier: Notifier,
}

impl AlertPipeline {
    pub fn new(
        store: Arc<Store>,
        bounties: Arc<dyn BountyFeed>,
        events: Arc<dyn EventFeed>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            bounties,
            events,
            notifier,
        }
    }

    /// One poll cycle. Bounties first, then events; a failure in one feed is
    /// logged and recorded in the report, and never skips the other.
    pub async fn poll_once(&self) -> PollReport {
        let fetched = self.bounties.fetch_bounties().await;
        let bounties = self
            .announce(FeedKind::Bounties, fetched, messages::bounty_alert)
            .await;

        let fetched = self.events.fetch_events().await;
        let events = self
            .announce(FeedKind::Events, fetched, messages::event_alert)
            .await;

        counter!("poll_cycles_total").increment(1);
        gauge!("poll_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        PollReport { bounties, events }
    }

    async fn announce<T: Fingerprinted>(
        &self,
        kind: FeedKind,
        fetched: FeedResult<T>,
        render: fn(&T) -> String,
    ) -> FeedCycle {
        if let FeedResult::Unavailable(reason) = &fetched {
            // Already logged by the adapter; the next cycle is the retry.
            return FeedCycle {
                error: Some(reason.clone()),
                ..Default::default()
            };
        }

        match self.try_announce(kind, fetched.into_items(), render).await {
            Ok(cycle) => cycle,
            Err(e) => {
                tracing::error!(feed = kind.as_str(), "feed check failed: {e:#}");
                FeedCycle {
                    error: Some(format!("{e:#}")),
                    ..Default::default()
                }
            }
        }
    }

    async fn try_announce<T: Fingerprinted>(
        &self,
        kind: FeedKind,
        records: Vec<T>,
        render: fn(&T) -> String,
    ) -> Result<FeedCycle> {
        let mut cycle = FeedCycle {
            fetched: records.len(),
            ..Default::default()
        };

        let detection = detect_new(&self.store, kind, records).await?;
        cycle.fresh = detection.fresh.len();
        if detection.fresh.is_empty() {
            return Ok(cycle);
        }

        let recipients = self.store.subscribers().await;
        for item in &detection.fresh {
            let report = self.notifier.broadcast(&render(item), &recipients).await;
            cycle.delivered += report.succeeded;
            cycle.failed += report.failed;
        }

        tracing::info!(
            feed = kind.as_str(),
            fresh = cycle.fresh,
            recipients = recipients.len(),
            delivered = cycle.delivered,
            failed = cycle.failed,
            "announced new items"
        );
        Ok(cycle)
    }
}

/// Run `poll_once` forever, sleeping `interval` after each cycle. A slow
/// cycle delays the next one; missed cycles are not caught up.
pub fn spawn_poll_loop(pipeline: AlertPipeline, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "poll scheduler started");
        loop {
            let report = pipeline.poll_once().await;
            tracing::debug!(?report, "poll cycle finished");
            tokio::time::sleep(interval).await;
        }
    })
}
