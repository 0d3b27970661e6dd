//! Runs one poll cycle and composes a digest against the configured feeds,
//! printing everything instead of sending it. State goes to a scratch file
//! so the real seen sets are left alone.

use std::sync::Arc;

use community_alerts::{
    feeds,
    notify::LogSender,
    opener::opener_from_env,
    AlertService, AppConfig, ChatId, Parts, Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = AppConfig::load_default()?;
    let scratch = std::env::temp_dir().join("community-alerts-preview.json");
    let _ = std::fs::remove_file(&scratch);
    let store = Store::open(&scratch).await?;

    let service = AlertService::new(Parts {
        store: Arc::new(store),
        bounties: feeds::bounty_feed_from_config(&cfg.feeds)?,
        events: feeds::event_feed_from_config(&cfg.feeds)?,
        sender: Arc::new(LogSender),
        opener: opener_from_env(&cfg.opener),
        community: cfg.community_name.clone(),
        max_bounties: cfg.digest.max_bounties,
        default_destination: cfg.digest.group_chat_id,
    });

    // One pretend subscriber so the fan-out path runs.
    service.subscribe(ChatId(1)).await?;
    let report = service.poll_once().await;
    println!("poll report: {}", serde_json::to_string_pretty(&report)?);

    println!("\n--- digest ---\n{}", service.compose_digest().await);
    Ok(())
}
