// src/config/opener.rs
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

/// Settings for the generated digest opener. The API key is never read from
/// the config file, only from `GEMINI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
