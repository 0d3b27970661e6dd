// src/store.rs
//! Seen-item store: the single persisted aggregate behind dedup, the
//! subscriber set and the daily-digest guard.
//!
//! All reads and mutations go through [`Store`]. Each mutating call holds the
//! lock for the whole read-modify-persist sequence, writes the full state to a
//! temp file and renames it over the old one, and only then swaps the new
//! state into memory. A failed persist leaves both memory and disk untouched
//! and is returned to the caller.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::{fs, sync::Mutex};

use crate::chat::SubscriberId;
use crate::fingerprint::Fingerprint;

pub const DEFAULT_STATE_PATH: &str = "db.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Bounties,
    Events,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Bounties => "bounties",
            FeedKind::Events => "events",
        }
    }
}

/// On-disk shape. No schema version yet; unknown fields are ignored and
/// missing ones default, so files written by older deployments still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub subscribers: BTreeSet<SubscriberId>,
    #[serde(default)]
    pub seen_bounties: BTreeSet<String>,
    #[serde(default)]
    pub seen_events: BTreeSet<String>,
    #[serde(default)]
    pub last_digest_date: Option<NaiveDate>,
}

impl PersistedState {
    fn seen(&self, kind: FeedKind) -> &BTreeSet<String> {
        match kind {
            FeedKind::Bounties => &self.seen_bounties,
            FeedKind::Events => &self.seen_events,
        }
    }

    fn seen_mut(&mut self, kind: FeedKind) -> &mut BTreeSet<String> {
        match kind {
            FeedKind::Bounties => &mut self.seen_bounties,
            FeedKind::Events => &mut self.seen_events,
        }
    }
}

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl Store {
    /// Load the state file, creating an empty one on first run.
    ///
    /// A file that exists but cannot be read or parsed is an error: the
    /// process must not continue with unknown state.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<PersistedState>(&raw)
                .with_context(|| format!("state file {} is corrupt", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let fresh = PersistedState::default();
                write_state(&path, &fresh)
                    .await
                    .with_context(|| format!("creating state file {}", path.display()))?;
                tracing::info!(path = %path.display(), "created empty state file");
                fresh
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading state file {}", path.display()))
            }
        };

        tracing::info!(
            path = %path.display(),
            subscribers = state.subscribers.len(),
            seen_bounties = state.seen_bounties.len(),
            seen_events = state.seen_events.len(),
            last_digest = ?state.last_digest_date,
            "state loaded"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> PersistedState {
        self.state.lock().await.clone()
    }

    pub async fn contains(&self, kind: FeedKind, fp: &Fingerprint) -> bool {
        self.state.lock().await.seen(kind).contains(fp.as_str())
    }

    /// Returns whether the fingerprint was newly added.
    pub async fn mark_seen(&self, kind: FeedKind, fp: &Fingerprint) -> Result<bool> {
        let mut inserted = self.mark_seen_many(kind, std::slice::from_ref(fp)).await?;
        Ok(inserted.pop().unwrap_or(false))
    }

    /// Marks every fingerprint seen with a single persist.
    ///
    /// The returned flags line up with `fps`; a fingerprint repeated within
    /// the batch is only reported as new the first time.
    pub async fn mark_seen_many(&self, kind: FeedKind, fps: &[Fingerprint]) -> Result<Vec<bool>> {
        self.mutate(|st| {
            let seen = st.seen_mut(kind);
            let flags: Vec<bool> = fps
                .iter()
                .map(|fp| seen.insert(fp.as_str().to_string()))
                .collect();
            let changed = flags.iter().any(|f| *f);
            (changed, flags)
        })
        .await
    }

    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.state.lock().await.subscribers.contains(&id)
    }

    pub async fn subscribers(&self) -> Vec<SubscriberId> {
        self.state.lock().await.subscribers.iter().copied().collect()
    }

    /// Returns whether the set changed.
    pub async fn add_subscriber(&self, id: SubscriberId) -> Result<bool> {
        self.mutate(|st| {
            let added = st.subscribers.insert(id);
            (added, added)
        })
        .await
    }

    /// Returns whether the set changed.
    pub async fn remove_subscriber(&self, id: SubscriberId) -> Result<bool> {
        self.mutate(|st| {
            let removed = st.subscribers.remove(&id);
            (removed, removed)
        })
        .await
    }

    pub async fn last_digest_date(&self) -> Option<NaiveDate> {
        self.state.lock().await.last_digest_date
    }

    pub async fn set_last_digest_date(&self, date: NaiveDate) -> Result<()> {
        self.mutate(|st| {
            let changed = st.last_digest_date != Some(date);
            st.last_digest_date = Some(date);
            (changed, ())
        })
        .await
    }

    /// Apply `f` to a copy of the state; persist and commit only if it
    /// reports a change. The lock is held across the write.
    async fn mutate<T>(&self, f: impl FnOnce(&mut PersistedState) -> (bool, T)) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let (changed, out) = f(&mut next);
        if changed {
            write_state(&self.path, &next)
                .await
                .with_context(|| format!("persisting state to {}", self.path.display()))?;
            *guard = next;
        }
        Ok(out)
    }
}

async fn write_state(path: &Path, state: &PersistedState) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating state dir {}", dir.display()))?;
    }
    let json = serde_json::to_vec_pretty(state).context("serializing state")?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)
        .await
        .with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(&json).await.context("writing state")?;
    f.sync_all().await.context("syncing state")?;
    drop(f);
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} into place", tmp.display()))?;
    Ok(())
}
