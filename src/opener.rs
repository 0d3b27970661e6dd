// src/opener.rs
//! Digest opener: one short motivational line, generated by Gemini when a key
//! is configured, otherwise a fixed local line. Generation never fails the
//! digest; any error falls back to a fixed line.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::OpenerConfig;

pub const HASHTAGS: &str = "#solana #web3 #community #smallcountrybigatheart #superteamireland";

/// Used when no generator is configured.
pub const FALLBACK_OPENER: &str = "“Builders write history in code, not in headlines.” ☘️\n\
#solana #web3 #community #smallcountrybigatheart #superteamireland";

/// Used when the generator is configured but the call fails.
pub const FAILURE_OPENER: &str = "“When markets dip, true builders rise.” ☘️\n\
#solana #web3 #community #smallcountrybigatheart #superteamireland";

const PROMPT: &str = "You are an inspirational Irish storyteller speaking to a Web3 builder community. \
Generate ONE short motivational quote (not a casual greeting), around 25 words, \
about crypto, builders, or community spirit. \
Make it sound like a proverb or wise saying, with a subtle Irish touch (not cheesy). \
At the end, put these hashtags on a NEW LINE:\n\
#solana #web3 #community #smallcountrybigatheart #superteamireland";

#[async_trait::async_trait]
pub trait OpenerSource: Send + Sync {
    /// Always yields a line; implementations handle their own failures.
    async fn opener(&self) -> String;
    fn name(&self) -> &'static str;
}

pub type DynOpener = Arc<dyn OpenerSource>;

/// Returns the same line every time.
#[derive(Debug, Clone)]
pub struct FixedOpener {
    line: String,
}

impl FixedOpener {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

impl Default for FixedOpener {
    fn default() -> Self {
        Self::new(FALLBACK_OPENER)
    }
}

#[async_trait::async_trait]
impl OpenerSource for FixedOpener {
    async fn opener(&self) -> String {
        self.line.clone()
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Gemini `generateContent`.
pub struct GeminiOpener {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl GeminiOpener {
    pub fn new(api_key: String, cfg: &OpenerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: cfg.model.clone(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: PROMPT }],
            }],
        };
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);

        let body: Resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .context("gemini request")?
            .error_for_status()
            .context("gemini non-2xx")?
            .json()
            .await
            .context("gemini response body")?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(anyhow!("gemini returned no text"));
        }
        Ok(ensure_hashtags(&text))
    }
}

#[async_trait::async_trait]
impl OpenerSource for GeminiOpener {
    async fn opener(&self) -> String {
        match self.generate().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("opener generation failed: {e:#}");
                FAILURE_OPENER.to_string()
            }
        }
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Appends the hashtag line when the model left it out.
pub fn ensure_hashtags(text: &str) -> String {
    if text.contains("#solana") {
        text.to_string()
    } else {
        format!("{text}\n{HASHTAGS}")
    }
}

/// Gemini when enabled and `GEMINI_API_KEY` is set, else the fixed line.
pub fn opener_from_env(cfg: &OpenerConfig) -> DynOpener {
    if !cfg.enabled {
        return Arc::new(FixedOpener::default());
    }
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(GeminiOpener::new(key.trim().to_string(), cfg)),
        _ => {
            tracing::info!("GEMINI_API_KEY not set; digest uses the fixed opener");
            Arc::new(FixedOpener::default())
        }
    }
}
