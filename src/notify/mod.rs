// src/notify/mod.rs
//! Delivery backends and subscriber fan-out.

pub mod log;
pub mod recording;
pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use serde::Serialize;

use crate::chat::ChatId;

pub use log::LogSender;
pub use recording::RecordingSender;
pub use telegram::TelegramSender;

/// Single-message delivery primitive. One attempt, no retries.
#[async_trait::async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, chat: ChatId, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn Deliver>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn Deliver>) -> Self {
        Self { sender }
    }

    /// Deliver `message` to every recipient in turn. A failure for one
    /// recipient is logged and counted; it never stops the rest.
    pub async fn broadcast(&self, message: &str, recipients: &[ChatId]) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for chat in recipients {
            match self.sender.deliver(*chat, message).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        recipient = %chat.anon(),
                        backend = self.sender.name(),
                        "alert delivery failed: {e:#}"
                    );
                }
            }
        }
        counter!("alerts_delivered_total").increment(report.succeeded as u64);
        counter!("alerts_delivery_failed_total").increment(report.failed as u64);
        report
    }

    /// Single delivery to a fixed destination (the digest path).
    pub async fn send_one(&self, chat: ChatId, message: &str) -> Result<()> {
        self.sender.deliver(chat, message).await
    }
}

/// Telegram when `TELEGRAM_TOKEN` is set, otherwise a log-only dry run.
pub fn sender_from_env(timeout_secs: u64) -> Arc<dyn Deliver> {
    match std::env::var("TELEGRAM_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            Arc::new(TelegramSender::new(token.trim().to_string()).with_timeout(timeout_secs))
        }
        _ => {
            tracing::warn!("TELEGRAM_TOKEN not set; alerts will only be logged");
            Arc::new(LogSender)
        }
    }
}
