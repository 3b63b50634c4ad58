// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ENV_METRICS_ENABLED: &str = "METRICS_ENABLED";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_fetch_attempts_total",
            "Fetch attempts per strategy path (proxy/direct)."
        );
        describe_counter!(
            "news_fetch_failures_total",
            "Failed fetch attempts per path and error kind."
        );
        describe_counter!(
            "news_fallback_total",
            "Times a later strategy ran because an earlier one failed."
        );
        describe_counter!("news_items_total", "News items emitted by the normalizer.");
        describe_counter!(
            "news_stale_results_total",
            "Refresh results discarded because a newer refresh was issued."
        );
        describe_counter!(
            "proxy_requests_total",
            "Proxy endpoint requests by outcome."
        );
        describe_histogram!("news_fetch_duration_ms", "Per-path fetch time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Honors `METRICS_ENABLED=1`; returns `None` when disabled.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let on = std::env::var(ENV_METRICS_ENABLED).ok().as_deref() == Some("1");
        if !on {
            return Ok(None);
        }
        Self::init().map(Some)
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
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
