// src/feeds/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One open bounty listing as delivered by the bounty feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BountyRecord {
    pub title: String,
    pub reward: String,           // e.g. "500 USDC" or "N/A"
    pub deadline: Option<String>, // "YYYY-MM-DD" when the listing has one
    pub link: String,
}

/// One upcoming calendar event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub title: String,
    pub date: String, // "YYYY-MM-DD HH:MM"
    pub link: String,
}

/// Outcome of a single feed fetch.
///
/// `Unavailable` carries a short reason for logs only; it is never shown to
/// subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedResult<T> {
    Empty,
    Unavailable(String),
    Items(Vec<T>),
}

impl<T> FeedResult<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            FeedResult::Empty
        } else {
            FeedResult::Items(items)
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            FeedResult::Items(v) => v,
            _ => &[],
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            FeedResult::Items(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FeedResult::Unavailable(_))
    }
}

#[async_trait]
pub trait BountyFeed: Send + Sync {
    /// Never errors: failures are reported as `FeedResult::Unavailable`.
    async fn fetch_bounties(&self) -> FeedResult<BountyRecord>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Future events only, ordered by start time.
    async fn fetch_events(&self) -> FeedResult<EventRecord>;
    fn name(&self) -> &'static str;
}
