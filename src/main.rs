//! Community alerts service entrypoint.
//! Loads config and state, starts the poll and digest schedulers, and serves
//! the control API.

use community_alerts::{api, metrics::Metrics, AlertService, AppConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs filtered by `RUST_LOG` (default `community_alerts=info,warn`).
/// No-op when the runtime already installed a subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("community_alerts=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    // A corrupt state file stops startup here.
    let service = AlertService::from_config(&cfg).await?;

    service.start_poll_loop(cfg.schedule.poll_interval());

    match (cfg.digest.enabled, cfg.digest.group_chat_id) {
        (true, Some(group)) => {
            service.start_digest_loop(cfg.digest.time_of_day(), cfg.digest.tz(), group);
        }
        (true, None) => tracing::warn!("digest.group_chat_id not set; daily digest disabled"),
        (false, _) => tracing::info!("daily digest disabled in config"),
    }

    let api_token = api::token_from_env();
    if api_token.is_none() {
        tracing::warn!("{} not set; control routes will answer 401", api::ENV_API_TOKEN);
    }
    let mut router = api::router(service, api_token);
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!("metrics disabled: {e:#}"),
    }

    Ok(router.into())
}
