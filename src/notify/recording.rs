// src/notify/recording.rs
use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::Deliver;
use crate::chat::ChatId;

/// In-memory backend for tests and previews. Records every successful
/// delivery; recipients registered via `fail_for` are rejected.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat: ChatId) {
        self.failing.lock().expect("failing mutex poisoned").insert(chat);
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    pub fn sent_to(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("sent mutex poisoned").clear();
    }
}

#[async_trait::async_trait]
impl Deliver for RecordingSender {
    async fn deliver(&self, chat: ChatId, text: &str) -> Result<()> {
        if self.failing.lock().expect("failing mutex poisoned").contains(&chat) {
            bail!("recipient {chat} rejected the message");
        }
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push((chat, text.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
