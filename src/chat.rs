// src/chat.rs
//! Chat identities used both as subscriber ids and as delivery destinations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque chat/user handle on the chat platform (Telegram chat ids are i64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl ChatId {
    /// Short, stable hash of the id for logs. Never log raw ids.
    pub fn anon(&self) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(self.0.to_string().as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

impl FromStr for ChatId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(ChatId)
    }
}

/// Subscribers are plain chat ids.
pub type SubscriberId = ChatId;
