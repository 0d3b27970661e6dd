// src/config/mod.rs
pub mod app;
pub mod opener;

pub use app::{AppConfig, DigestConfig, FeedsConfig, ScheduleConfig};
pub use opener::OpenerConfig;
