// src/api.rs
//! Proxy endpoint: holds the credential server-side, calls the model, normalizes,
//! and serves `{ news, timestamp }`. Failures answer non-2xx with `{ error, message }`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::counter;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ai::AiConfig;
use crate::error::{ErrorKind, FetchError};
use crate::fetch::providers::direct::generate_news;
use crate::metrics::{ensure_metrics_described, Metrics};
use crate::news::{NewsEnvelope, ProxyErrorBody};
use crate::normalize::CitationPolicy;
use crate::upstream::{build_upstream, prompt, DynUpstream, GenerateRequest};

pub const NEWS_PATH: &str = "/api/news";
/// Path the original serverless deployment used.
pub const LEGACY_NEWS_PATH: &str = "/.netlify/functions/api";

#[derive(Clone)]
pub struct ProxyState {
    upstream: Option<DynUpstream>,
    request: Arc<GenerateRequest>,
    policy: CitationPolicy,
}

impl ProxyState {
    pub fn new(upstream: Option<DynUpstream>, request: GenerateRequest, policy: CitationPolicy) -> Self {
        Self {
            upstream,
            request: Arc::new(request),
            policy,
        }
    }

    /// Server-side state from config; a missing credential is reported per request.
    pub fn from_config(cfg: &AiConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            build_upstream(cfg)?,
            prompt::build_request(cfg),
            cfg.citations.policy(),
        ))
    }

    pub fn has_credential(&self) -> bool {
        self.upstream.is_some()
    }
}

pub fn router(state: ProxyState) -> Router {
    ensure_metrics_described();
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(NEWS_PATH, get(get_news))
        .route(LEGACY_NEWS_PATH, get(get_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Proxy router plus `/metrics` when a recorder is installed.
pub fn router_with_metrics(state: ProxyState, metrics: Option<&Metrics>) -> Router {
    let base = router(state);
    match metrics {
        Some(m) => base.merge(m.router()),
        None => base,
    }
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
    (
        status,
        Json(ProxyErrorBody {
            error: error.to_string(),
            message,
        }),
    )
        .into_response()
}

async fn get_news(State(state): State<ProxyState>) -> Response {
    let Some(upstream) = state.upstream.as_ref() else {
        counter!("proxy_requests_total", "outcome" => "config_error").increment(1);
        error!(target: "proxy", "API_KEY is not configured on the server");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Config Error",
            "サーバーの環境変数に API_KEY が設定されていません。".to_string(),
        );
    };

    match generate_news(upstream, &state.request, state.policy).await {
        Ok(items) => {
            counter!("proxy_requests_total", "outcome" => "ok").increment(1);
            info!(target: "proxy", items = items.len(), provider = upstream.provider_name(), "served news");
            (StatusCode::OK, Json(NewsEnvelope::stamped(items))).into_response()
        }
        Err(e) => {
            counter!("proxy_requests_total", "outcome" => e.kind().as_str()).increment(1);
            error!(target: "proxy", kind = e.kind().as_str(), error = %e, "upstream call failed");
            let status = if e.kind() == ErrorKind::RateLimited {
                StatusCode::TOO_MANY_REQUESTS
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, "Server Error", e.to_string())
        }
    }
}
