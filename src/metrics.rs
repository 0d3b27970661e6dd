use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("alerts_delivered_total", "Alert messages delivered to subscribers.");
    describe_counter!(
        "alerts_delivery_failed_total",
        "Alert deliveries that failed for a single recipient."
    );
    describe_counter!("feed_errors_total", "Feed fetch/parse failures, by feed.");
    describe_counter!("poll_cycles_total", "Completed poll cycles.");
    describe_counter!("digest_sent_total", "Daily digests delivered.");
    describe_gauge!("subscribers", "Current subscriber count.");
    describe_gauge!("poll_last_run_ts", "Unix ts when the last poll cycle finished.");
}
