// src/fetch/mod.rs
//! Fallback orchestration: an ordered list of fetch strategies tried until one
//! succeeds. Default chain is proxy first, then a direct model call.

pub mod providers;

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::config::ai::{AiConfig, Locale};
use crate::error::{ErrorKind, FetchError};
use crate::metrics::ensure_metrics_described;
use crate::news::NewsItem;
use providers::{direct::DirectStrategy, proxy::ProxyStrategy};

#[async_trait]
pub trait NewsStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Local precondition, checked right before this strategy would run. A failure
    /// counts as this path's attempt without any network call.
    fn ready(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError>;
}

/// Every strategy failed, in the order they ran.
#[derive(Debug, Default)]
pub struct Exhausted {
    pub failures: Vec<(&'static str, FetchError)>,
}

impl Exhausted {
    /// Collapse to one error: configuration beats rate limiting beats the last failure.
    pub fn into_error(self) -> FetchError {
        let pick = |kind: ErrorKind| {
            self.failures
                .iter()
                .find(|(_, e)| e.kind() == kind)
                .map(|(_, e)| e.clone())
        };
        pick(ErrorKind::Configuration)
            .or_else(|| pick(ErrorKind::RateLimited))
            .or_else(|| self.failures.last().map(|(_, e)| e.clone()))
            .unwrap_or_else(|| FetchError::Transport("no fetch strategy configured".into()))
    }
}

/// Run strategies in order; the first `Ok` wins. No retries, no backoff.
pub async fn first_success(
    strategies: &[Box<dyn NewsStrategy>],
) -> Result<(&'static str, Vec<NewsItem>), Exhausted> {
    let mut exhausted = Exhausted::default();
    for (i, s) in strategies.iter().enumerate() {
        let path = s.name();
        if i > 0 {
            counter!("news_fallback_total").increment(1);
            info!(target: "fetch", path, previous = strategies[i - 1].name(), "falling back");
        }
        let res = match s.ready() {
            Err(e) => {
                debug!(target: "fetch", path, "not ready; no request sent");
                Err(e)
            }
            Ok(()) => {
                counter!("news_fetch_attempts_total", "path" => path).increment(1);
                let t0 = Instant::now();
                let res = s.fetch().await;
                histogram!("news_fetch_duration_ms", "path" => path)
                    .record(t0.elapsed().as_secs_f64() * 1_000.0);
                res
            }
        };
        match res {
            Ok(items) => {
                info!(target: "fetch", path, items = items.len(), "fetch ok");
                return Ok((path, items));
            }
            Err(e) => {
                warn!(target: "fetch", path, kind = e.kind().as_str(), error = %e, "fetch failed");
                counter!("news_fetch_failures_total", "path" => path, "kind" => e.kind().as_str())
                    .increment(1);
                exhausted.failures.push((path, e));
            }
        }
    }
    Err(exhausted)
}

pub struct FallbackOrchestrator {
    strategies: Vec<Box<dyn NewsStrategy>>,
    locale: Locale,
}

impl FallbackOrchestrator {
    pub fn new(strategies: Vec<Box<dyn NewsStrategy>>, locale: Locale) -> Self {
        Self { strategies, locale }
    }

    /// Proxy at `cfg.proxy_url`, then a direct Gemini call with the local credential.
    pub fn from_config(cfg: &AiConfig) -> Result<Self, FetchError> {
        let proxy = ProxyStrategy::new(&cfg.proxy_url, cfg.citations.policy())?;
        let direct = DirectStrategy::from_config(cfg)?;
        let strategies: Vec<Box<dyn NewsStrategy>> = vec![Box::new(proxy), Box::new(direct)];
        Ok(Self::new(strategies, cfg.locale))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Non-empty batch, or one error whose `user_message` is safe to display.
    pub async fn fetch_news(&self) -> Result<Vec<NewsItem>, FetchError> {
        ensure_metrics_described();

        let (path, items) = first_success(&self.strategies).await.map_err(|ex| {
            let err = ex.into_error();
            warn!(
                target: "fetch",
                kind = err.kind().as_str(),
                shown = err.user_message(self.locale),
                "all paths failed"
            );
            err
        })?;
        if items.is_empty() {
            warn!(target: "fetch", path, "strategy succeeded with zero items");
            return Err(FetchError::Empty);
        }
        Ok(items)
    }
}
