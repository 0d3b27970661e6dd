// src/notify/log.rs
use anyhow::Result;

use super::Deliver;
use crate::chat::ChatId;

/// Dry-run backend: logs what would have been sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait::async_trait]
impl Deliver for LogSender {
    async fn deliver(&self, chat: ChatId, text: &str) -> Result<()> {
        tracing::info!(recipient = %chat.anon(), chars = text.chars().count(), "dry-run delivery:\n{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
