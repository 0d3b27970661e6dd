// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod chat;
pub mod config;
pub mod metrics;
pub mod service;

// Dedup state and change detection
pub mod change_detector;
pub mod fingerprint;
pub mod registry;
pub mod store;

// Feeds in, messages out
pub mod feeds;
pub mod messages;
pub mod notify;
pub mod opener;

// Background jobs
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::chat::{ChatId, SubscriberId};
pub use crate::config::AppConfig;
pub use crate::notify::{BroadcastReport, Deliver, Notifier};
pub use crate::service::{AlertService, Parts};
pub use crate::store::{FeedKind, PersistedState, Store};
