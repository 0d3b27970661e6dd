// src/service.rs
//! Everything the transport layer may call, wired around one shared `Store`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::chat::{ChatId, SubscriberId};
use crate::config::AppConfig;
use crate::feeds::{
    self,
    types::{BountyFeed, EventFeed},
};
use crate::messages;
use crate::notify::{self, Deliver, Notifier};
use crate::opener::{self, DynOpener};
use crate::registry::{SubscribeOutcome, SubscriberRegistry, UnsubscribeOutcome};
use crate::scheduler::{
    spawn_digest_loop, spawn_poll_loop, AlertPipeline, DigestComposer, DigestScheduler, PollReport,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AlertService {
    store: Arc<Store>,
    registry: SubscriberRegistry,
    pipeline: AlertPipeline,
    composer: DigestComposer,
    notifier: Notifier,
    bounties: Arc<dyn BountyFeed>,
    events: Arc<dyn EventFeed>,
    community: String,
    default_destination: Option<ChatId>,
}

/// Collaborators handed to [`AlertService::new`].
pub struct Parts {
    pub store: Arc<Store>,
    pub bounties: Arc<dyn BountyFeed>,
    pub events: Arc<dyn EventFeed>,
    pub sender: Arc<dyn Deliver>,
    pub opener: DynOpener,
    pub community: String,
    pub max_bounties: usize,
    pub default_destination: Option<ChatId>,
}

impl AlertService {
    pub fn new(parts: Parts) -> Self {
        let notifier = Notifier::new(parts.sender);
        let pipeline = AlertPipeline::new(
            parts.store.clone(),
            parts.bounties.clone(),
            parts.events.clone(),
            notifier.clone(),
        );
        let composer = DigestComposer::new(
            parts.bounties.clone(),
            parts.events.clone(),
            parts.opener,
            parts.community.clone(),
            parts.max_bounties,
        );
        Self {
            registry: SubscriberRegistry::new(parts.store.clone()),
            store: parts.store,
            pipeline,
            composer,
            notifier,
            bounties: parts.bounties,
            events: parts.events,
            community: parts.community,
            default_destination: parts.default_destination,
        }
    }

    /// Open the state file (fatal if corrupt) and build the production
    /// collaborators from config and environment.
    pub async fn from_config(cfg: &AppConfig) -> Result<Self> {
        let store = Store::open(&cfg.state_path)
            .await
            .context("opening state store")?;
        let service = Self::new(Parts {
            store: Arc::new(store),
            bounties: feeds::bounty_feed_from_config(&cfg.feeds)?,
            events: feeds::event_feed_from_config(&cfg.feeds)?,
            sender: notify::sender_from_env(cfg.feeds.timeout_secs),
            opener: opener::opener_from_env(&cfg.opener),
            community: cfg.community_name.clone(),
            max_bounties: cfg.digest.max_bounties,
            default_destination: cfg.digest.group_chat_id,
        });
        service.registry.publish_count().await;
        Ok(service)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn default_destination(&self) -> Option<ChatId> {
        self.default_destination
    }

    pub async fn subscribe(&self, id: SubscriberId) -> Result<SubscribeOutcome> {
        self.registry.subscribe(id).await
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<UnsubscribeOutcome> {
        self.registry.unsubscribe(id).await
    }

    pub async fn poll_once(&self) -> PollReport {
        self.pipeline.poll_once().await
    }

    pub fn start_poll_loop(&self, interval: Duration) -> JoinHandle<()> {
        spawn_poll_loop(self.pipeline.clone(), interval)
    }

    pub fn digest_scheduler(&self, at: NaiveTime, tz: Tz, destination: ChatId) -> DigestScheduler {
        DigestScheduler::new(
            self.store.clone(),
            self.composer.clone(),
            self.notifier.clone(),
            at,
            tz,
            destination,
        )
    }

    pub fn start_digest_loop(&self, at: NaiveTime, tz: Tz, destination: ChatId) -> JoinHandle<()> {
        spawn_digest_loop(self.digest_scheduler(at, tz, destination))
    }

    /// Manual trigger; leaves the daily guard alone.
    pub async fn send_digest_now(&self, destination: ChatId) -> Result<()> {
        self.composer.send_now(&self.notifier, destination).await
    }

    pub async fn compose_digest(&self) -> String {
        self.composer.compose().await
    }

    /// Current open bounties, rendered for an on-demand request.
    pub async fn bounty_list(&self) -> String {
        messages::bounty_list(&self.bounties.fetch_bounties().await)
    }

    /// Next upcoming events, rendered for an on-demand request.
    pub async fn event_list(&self) -> String {
        messages::event_list(&self.events.fetch_events().await)
    }

    pub fn welcome(&self) -> String {
        messages::welcome(&self.community)
    }
}
