// src/change_detector.rs
use anyhow::Result;

use crate::fingerprint::{Fingerprint, Fingerprinted};
use crate::store::{FeedKind, Store};

/// Split of one fetch into records never announced before and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection<T> {
    pub fresh: Vec<T>,
    pub already_seen: Vec<T>,
}

impl<T> Default for Detection<T> {
    fn default() -> Self {
        Self {
            fresh: Vec::new(),
            already_seen: Vec::new(),
        }
    }
}

/// Partition `records` against the seen set for `kind`, preserving feed order.
///
/// Fresh fingerprints are persisted as seen before this returns, so nothing
/// is announced twice even if the caller dies mid fan-out. The flip side is
/// that such an item may never be announced at all.
pub async fn detect_new<T: Fingerprinted>(
    store: &Store,
    kind: FeedKind,
    records: Vec<T>,
) -> Result<Detection<T>> {
    if records.is_empty() {
        return Ok(Detection::default());
    }

    let fps: Vec<Fingerprint> = records.iter().map(Fingerprinted::fingerprint).collect();
    let inserted = store.mark_seen_many(kind, &fps).await?;

    let mut out = Detection::default();
    for (rec, is_new) in records.into_iter().zip(inserted) {
        if is_new {
            out.fresh.push(rec);
        } else {
            out.already_seen.push(rec);
        }
    }

    tracing::debug!(
        feed = kind.as_str(),
        fresh = out.fresh.len(),
        already_seen = out.already_seen.len(),
        "change detection"
    );
    Ok(out)
}
