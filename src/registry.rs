// src/registry.rs
use std::sync::Arc;

use anyhow::Result;
use metrics::gauge;
use serde::Serialize;

use crate::chat::SubscriberId;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscribeOutcome {
    pub already_subscribed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnsubscribeOutcome {
    pub was_subscribed: bool,
}

/// Subscriber set as seen by the transport layer. Both operations are
/// idempotent; the outcome flags only drive confirmation text.
#[derive(Debug, Clone)]
pub struct SubscriberRegistry {
    store: Arc<Store>,
}

impl SubscriberRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn subscribe(&self, id: SubscriberId) -> Result<SubscribeOutcome> {
        let added = self.store.add_subscriber(id).await?;
        if added {
            tracing::info!(subscriber = %id.anon(), "subscribed");
            self.publish_count().await;
        }
        Ok(SubscribeOutcome {
            already_subscribed: !added,
        })
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<UnsubscribeOutcome> {
        let removed = self.store.remove_subscriber(id).await?;
        if removed {
            tracing::info!(subscriber = %id.anon(), "unsubscribed");
            self.publish_count().await;
        }
        Ok(UnsubscribeOutcome {
            was_subscribed: removed,
        })
    }

    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.store.is_subscribed(id).await
    }

    pub async fn list(&self) -> Vec<SubscriberId> {
        self.store.subscribers().await
    }

    pub async fn count(&self) -> usize {
        self.store.subscribers().await.len()
    }

    /// Also called once at startup so the gauge exists before any change.
    pub async fn publish_count(&self) {
        gauge!("subscribers").set(self.count().await as f64);
    }
}
