// src/scheduler/mod.rs
//! The two long-lived tasks: the fixed-interval poller and the once-a-day
//! digest. They share one `Store` and nothing else.

pub mod digest;
pub mod poll;

pub use digest::{spawn_digest_loop, spawn_digest_loop_with, DigestComposer, DigestScheduler, DIGEST_TICK};
pub use poll::{spawn_poll_loop, AlertPipeline, FeedCycle, PollReport};
