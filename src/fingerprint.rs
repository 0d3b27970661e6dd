// src/fingerprint.rs
//! Dedup keys derived from the stable identifying fields of feed records.

use std::fmt;

use crate::feeds::types::{BountyRecord, EventRecord};

/// Membership key for the seen sets. Never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Fingerprinted {
    fn fingerprint(&self) -> Fingerprint;
}

/// `<title>_<deadline>`; a missing deadline is rendered as `None` so keys
/// written by earlier deployments keep matching.
impl Fingerprinted for BountyRecord {
    fn fingerprint(&self) -> Fingerprint {
        let deadline = self.deadline.as_deref().unwrap_or("None");
        Fingerprint(format!("{}_{}", self.title, deadline))
    }
}

/// `<title>_<date>`
impl Fingerprinted for EventRecord {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint(format!("{}_{}", self.title, self.date))
    }
}
