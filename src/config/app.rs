// src/config/app.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;

use super::opener::OpenerConfig;
use crate::chat::ChatId;
use crate::store::DEFAULT_STATE_PATH;

pub const ENV_CONFIG_PATH: &str = "ALERTS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/alerts.toml";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Dublin;
pub const DEFAULT_DIGEST_TIME: &str = "08:00";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub state_path: PathBuf,
    /// Shown in the digest header.
    pub community_name: String,
    pub feeds: FeedsConfig,
    pub schedule: ScheduleConfig,
    pub digest: DigestConfig,
    pub opener: OpenerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            community_name: "Superteam Ireland".to_string(),
            feeds: FeedsConfig::default(),
            schedule: ScheduleConfig::default(),
            digest: DigestConfig::default(),
            opener: OpenerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Bounty listing API (JSON). Unset disables the feed.
    pub bounties: Option<String>,
    /// ICS calendar URL. Unset disables the feed.
    pub events: Option<String>,
    pub timeout_secs: u64,
    pub bounty_limit: usize,
    pub event_limit: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            bounties: None,
            events: None,
            timeout_secs: 10,
            bounty_limit: 5,
            event_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub poll_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { poll_minutes: 10 }
    }
}

impl ScheduleConfig {
    /// At least one minute.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_minutes.max(1) * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub enabled: bool,
    /// Local "HH:MM".
    pub time: String,
    /// IANA zone name.
    pub timezone: String,
    pub group_chat_id: Option<ChatId>,
    pub max_bounties: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: DEFAULT_DIGEST_TIME.to_string(),
            timezone: DEFAULT_TIMEZONE.name().to_string(),
            group_chat_id: None,
            max_bounties: crate::messages::DEFAULT_DIGEST_BOUNTIES,
        }
    }
}

impl DigestConfig {
    /// Falls back to 08:00 when `time` is not "HH:MM".
    pub fn time_of_day(&self) -> NaiveTime {
        parse_time_of_day(&self.time).unwrap_or_else(|| {
            tracing::warn!(value = %self.time, "invalid digest time, using {DEFAULT_DIGEST_TIME}");
            NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
        })
    }

    pub fn tz(&self) -> Tz {
        resolve_timezone(&self.timezone)
    }
}

/// "HH:MM" (24h). Seconds are always zero.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

/// Unknown zone names fall back to Europe/Dublin.
pub fn resolve_timezone(name: &str) -> Tz {
    name.trim().parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = %name, "unknown timezone, falling back to {}", DEFAULT_TIMEZONE.name());
        DEFAULT_TIMEZONE
    })
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(raw)?;
        Ok(cfg)
    }

    /// Resolution order:
    /// 1) $ALERTS_CONFIG_PATH (must exist)
    /// 2) config/alerts.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display()));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        tracing::warn!("no config file found, using defaults");
        Ok(Self::default())
    }
}
