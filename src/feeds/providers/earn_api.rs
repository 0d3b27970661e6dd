// src/feeds/providers/earn_api.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::feeds::types::{BountyFeed, BountyRecord, FeedResult};

const LISTING_BASE: &str = "https://earn.superteam.fun/listing/";

#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    results: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    title: Option<String>,
    reward_amount: Option<Value>,
    token: Option<String>,
    deadline: Option<Value>,
    slug: Option<String>,
}

/// "<amount> <token>", or "N/A" when the amount is missing, null or zero.
fn reward_text(amount: Option<&Value>, token: Option<&str>) -> String {
    let amount = match amount {
        Some(Value::Number(n)) if n.as_f64().is_some_and(|f| f != 0.0) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return "N/A".to_string(),
    };
    format!("{} {}", amount, token.unwrap_or_default())
        .trim_end()
        .to_string()
}

/// Date part of an ISO timestamp; non-strings mean "no deadline".
fn deadline_text(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(s)) => Some(s.chars().take(10).collect()),
        _ => None,
    }
}

fn listing_link(slug: Option<&str>) -> String {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => format!("{LISTING_BASE}{slug}"),
        None => "#".to_string(),
    }
}

pub struct EarnBountyFeed {
    mode: Mode,
    limit: usize,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl EarnBountyFeed {
    pub fn from_url(url: &str, timeout: Duration, limit: usize) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client: crate::feeds::http_client(timeout)?,
            },
            limit,
        })
    }

    /// Serve a canned API response (tests, previews).
    pub fn from_fixture(body: &str, limit: usize) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            limit,
        }
    }

    pub fn parse_listings(body: &str, limit: usize) -> Result<Vec<BountyRecord>> {
        let page: ListingPage = serde_json::from_str(body).context("parsing listings json")?;
        let out = page
            .results
            .into_iter()
            .take(limit)
            .map(|l| BountyRecord {
                title: l.title.unwrap_or_else(|| "No title".to_string()),
                reward: reward_text(l.reward_amount.as_ref(), l.token.as_deref()),
                deadline: deadline_text(l.deadline.as_ref()),
                link: listing_link(l.slug.as_deref()),
            })
            .collect();
        Ok(out)
    }

    async fn fetch_body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => client
                .get(url)
                .send()
                .await
                .context("bounty http get")?
                .error_for_status()
                .context("bounty http status")?
                .text()
                .await
                .context("bounty http body"),
        }
    }
}

#[async_trait]
impl BountyFeed for EarnBountyFeed {
    async fn fetch_bounties(&self) -> FeedResult<BountyRecord> {
        let parsed = match self.fetch_body().await {
            Ok(body) => Self::parse_listings(&body, self.limit),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(items) => FeedResult::from_items(items),
            Err(e) => crate::feeds::unavailable(self.name(), e),
        }
    }

    fn name(&self) -> &'static str {
        "bounties"
    }
}
