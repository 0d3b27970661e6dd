// src/notify/telegram.rs
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Deliver;
use crate::chat::ChatId;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage` in HTML parse mode.
#[derive(Clone)]
pub struct TelegramSender {
    token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl TelegramSender {
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    /// Point at a different Bot API server (self-hosted or test double).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait::async_trait]
impl Deliver for TelegramSender {
    async fn deliver(&self, chat: ChatId, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: chat.0,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // The token is part of the URL; strip it from any error we return.
        let rsp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram request failed: {}", e.without_url()))?;

        let status = rsp.status();
        let reply: Option<ApiReply> = rsp.json().await.ok();
        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiReply { description, .. }) => Err(anyhow!(
                "telegram rejected message ({status}): {}",
                description.unwrap_or_else(|| "no description".into())
            )),
            None => Err(anyhow!("telegram returned unreadable reply ({status})")),
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
