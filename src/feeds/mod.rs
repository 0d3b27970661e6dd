// src/feeds/mod.rs
//! Feed adapters: turn the remote bounty API and the ICS calendar into plain
//! records. Failures never escape as errors; they surface as
//! `FeedResult::Unavailable` and a counter bump.

pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::config::FeedsConfig;
use providers::{earn_api::EarnBountyFeed, ics_calendar::IcsEventFeed};
use types::{BountyFeed, BountyRecord, EventFeed, EventRecord, FeedResult};

/// Log and count a failed fetch, returning the `Unavailable` marker.
pub(crate) fn unavailable<T>(feed: &'static str, err: anyhow::Error) -> FeedResult<T> {
    tracing::warn!(feed, "feed fetch failed: {err:#}");
    counter!("feed_errors_total", "feed" => feed).increment(1);
    FeedResult::Unavailable(format!("{err:#}"))
}

/// Every feed request is bounded by `timeout`; a client that cannot be built
/// with it is an error, never an unbounded fallback.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("community-alerts/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout.min(Duration::from_secs(4)))
        .timeout(timeout)
        .build()
        .context("building feed http client")
}

/// Stand-in for a feed with no configured URL.
#[derive(Debug, Clone, Copy)]
pub struct DisabledFeed;

#[async_trait]
impl BountyFeed for DisabledFeed {
    async fn fetch_bounties(&self) -> FeedResult<BountyRecord> {
        FeedResult::Unavailable("bounty feed not configured".into())
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[async_trait]
impl EventFeed for DisabledFeed {
    async fn fetch_events(&self) -> FeedResult<EventRecord> {
        FeedResult::Unavailable("event feed not configured".into())
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub fn bounty_feed_from_config(cfg: &FeedsConfig) -> Result<Arc<dyn BountyFeed>> {
    Ok(match cfg.bounties.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Arc::new(EarnBountyFeed::from_url(
            url,
            Duration::from_secs(cfg.timeout_secs.max(1)),
            cfg.bounty_limit,
        )?),
        None => {
            tracing::warn!("feeds.bounties not set; bounty alerts disabled");
            Arc::new(DisabledFeed)
        }
    })
}

pub fn event_feed_from_config(cfg: &FeedsConfig) -> Result<Arc<dyn EventFeed>> {
    Ok(match cfg.events.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Arc::new(IcsEventFeed::from_url(
            url,
            Duration::from_secs(cfg.timeout_secs.max(1)),
            cfg.event_limit,
        )?),
        None => {
            tracing::warn!("feeds.events not set; event alerts disabled");
            Arc::new(DisabledFeed)
        }
    })
}
