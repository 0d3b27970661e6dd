// src/scheduler/digest.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use metrics::counter;
use tokio::task::JoinHandle;

use crate::chat::ChatId;
use crate::feeds::types::{BountyFeed, EventFeed};
use crate::messages;
use crate::notify::Notifier;
use crate::opener::DynOpener;
use crate::store::Store;

/// How often the loop looks at the clock.
pub const DIGEST_TICK: Duration = Duration::from_secs(30);

/// Builds the daily brief from live feeds. Not gated by the seen sets.
#[derive(Clone)]
pub struct DigestComposer {
    bounties: Arc<dyn BountyFeed>,
    events: Arc<dyn EventFeed>,
    opener: DynOpener,
    community: String,
    max_bounties: usize,
}

impl DigestComposer {
    pub fn new(
        bounties: Arc<dyn BountyFeed>,
        events: Arc<dyn EventFeed>,
        opener: DynOpener,
        community: impl Into<String>,
        max_bounties: usize,
    ) -> Self {
        Self {
            bounties,
            events,
            opener,
            community: community.into(),
            max_bounties,
        }
    }

    pub async fn compose(&self) -> String {
        let (opener, events, bounties) = tokio::join!(
            self.opener.opener(),
            self.events.fetch_events(),
            self.bounties.fetch_bounties()
        );
        messages::digest(&self.community, &opener, &events, &bounties, self.max_bounties)
    }

    /// Compose and deliver once to `destination`. Does not touch the
    /// last-digest date.
    pub async fn send_now(&self, notifier: &Notifier, destination: ChatId) -> Result<()> {
        let text = self.compose().await;
        notifier.send_one(destination, &text).await?;
        counter!("digest_sent_total").increment(1);
        tracing::info!(destination = %destination.anon(), "digest delivered");
        Ok(())
    }
}

/// Fires at most once per local calendar day at `at` (hour:minute).
#[derive(Clone)]
pub struct DigestScheduler {
    store: Arc<Store>,
    composer: DigestComposer,
    notifier: Notifier,
    at: NaiveTime,
    tz: Tz,
    destination: ChatId,
    /// Day of the last attempt in this process. Holds even when the stored
    /// date could not be persisted.
    fired_on: Arc<Mutex<Option<NaiveDate>>>,
}

impl DigestScheduler {
    pub fn new(
        store: Arc<Store>,
        composer: DigestComposer,
        notifier: Notifier,
        at: NaiveTime,
        tz: Tz,
        destination: ChatId,
    ) -> Self {
        Self {
            store,
            composer,
            notifier,
            at,
            tz,
            destination,
            fired_on: Arc::new(Mutex::new(None)),
        }
    }

    /// Target minute reached and no digest recorded for today.
    pub fn should_fire(&self, now: DateTime<Tz>, last: Option<NaiveDate>) -> bool {
        now.hour() == self.at.hour()
            && now.minute() == self.at.minute()
            && last != Some(now.date_naive())
    }

    /// One clock check. Returns whether a digest was attempted.
    ///
    /// The date is recorded even when delivery fails: there is a single
    /// attempt per day. A failure to persist the date is returned, and the
    /// in-process guard still blocks a second attempt that day.
    pub async fn tick(&self, now: DateTime<Tz>) -> Result<bool> {
        let today = now.date_naive();
        let last = self.store.last_digest_date().await;
        if !self.should_fire(now, last) {
            return Ok(false);
        }
        {
            let mut fired = self.fired_on.lock().expect("fired_on mutex poisoned");
            if *fired == Some(today) {
                return Ok(false);
            }
            *fired = Some(today);
        }

        tracing::info!(date = %today, "sending daily digest");
        if let Err(e) = self.composer.send_now(&self.notifier, self.destination).await {
            tracing::warn!(destination = %self.destination.anon(), "digest delivery failed: {e:#}");
        }
        self.store.set_last_digest_date(today).await?;
        Ok(true)
    }
}

/// Check the wall clock every `DIGEST_TICK` forever. No sleep after a fire:
/// the day guards in `tick` stop a second send within the target minute.
pub fn spawn_digest_loop(scheduler: DigestScheduler) -> JoinHandle<()> {
    spawn_digest_loop_with(scheduler, Utc::now)
}

/// Same loop, reading "now" from `clock`.
pub fn spawn_digest_loop_with<F>(scheduler: DigestScheduler, clock: F) -> JoinHandle<()>
where
    F: Fn() -> DateTime<Utc> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(
            at = %scheduler.at.format("%H:%M"),
            timezone = scheduler.tz.name(),
            "digest scheduler started"
        );
        loop {
            let now = clock().with_timezone(&scheduler.tz);
            if let Err(e) = scheduler.tick(now).await {
                tracing::error!("digest tick failed: {e:#}");
            }
            tokio::time::sleep(DIGEST_TICK).await;
        }
    })
}
