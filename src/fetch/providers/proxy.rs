// src/fetch/providers/proxy.rs
use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::NewsStrategy;
use crate::news::{NewsItem, ProxyErrorBody};
use crate::normalize::{self, CitationPolicy};

/// One `GET` against the proxy endpoint. Any non-2xx, network error, or
/// malformed body counts as failure.
pub struct ProxyStrategy {
    http: reqwest::Client,
    url: String,
    policy: CitationPolicy,
}

impl ProxyStrategy {
    pub fn new(url: &str, policy: CitationPolicy) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("techinvest-ai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(format!("building http client: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
            policy,
        })
    }
}

#[async_trait]
impl NewsStrategy for ProxyStrategy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| FetchError::from_reqwest(&e))?;
        if !status.is_success() {
            // Prefer the `{ error, message }` body; fall back to the raw text.
            let detail = serde_json::from_str::<ProxyErrorBody>(&body)
                .ok()
                .map(|b| format!("{}: {}", b.error, b.message))
                .unwrap_or(body);
            debug!(target: "fetch", status = status.as_u16(), "proxy non-success");
            return Err(FetchError::from_status(status.as_u16(), &detail));
        }

        // Proxy items already carry ids and citations; normalize keeps them.
        normalize::normalize_text(&body, &[], self.policy)
    }
}
