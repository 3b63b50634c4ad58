//! TechInvest proxy: Binary Entrypoint
//! Boots the Axum server that holds the API key and forwards news requests to the model.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};

use techinvest_ai::api::{self, ProxyState};
use techinvest_ai::config::AiConfig;
use techinvest_ai::metrics::Metrics;
use techinvest_ai::telemetry::{init_tracing, DEFAULT_LOG_FILTER};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing(DEFAULT_LOG_FILTER);

    let cfg = AiConfig::load_default().context("loading proxy config")?;
    let state = ProxyState::from_config(&cfg).context("building upstream client")?;
    if !state.has_credential() {
        warn!(target: "proxy", "API_KEY missing; /api/news will answer Config Error");
    }
    info!(target: "proxy", model = %cfg.model, strategy = ?cfg.prompt_strategy, "proxy ready");

    let metrics = Metrics::from_env()?;
    let router = api::router_with_metrics(state, metrics.as_ref());

    Ok(router.into())
}
