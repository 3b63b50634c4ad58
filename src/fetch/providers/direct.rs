// src/fetch/providers/direct.rs
use async_trait::async_trait;

use crate::config::ai::AiConfig;
use crate::error::FetchError;
use crate::fetch::NewsStrategy;
use crate::news::NewsItem;
use crate::normalize::{self, CitationPolicy};
use crate::upstream::{build_upstream, prompt, DynUpstream, GenerateRequest};

const MISSING_KEY: &str = "API_KEY is not set (or is the placeholder \"undefined\")";

/// One model call plus normalization. Shared by the direct strategy and the proxy
/// endpoint so both paths produce identical batches.
pub async fn generate_news(
    upstream: &DynUpstream,
    request: &GenerateRequest,
    policy: CitationPolicy,
) -> Result<Vec<NewsItem>, FetchError> {
    let reply = upstream.generate(request).await?;
    normalize::normalize_text(&reply.text, &reply.citations, policy)
}

/// Calls the upstream model from the caller's own context. Not ready without a
/// local credential.
pub struct DirectStrategy {
    upstream: Option<DynUpstream>,
    request: GenerateRequest,
    policy: CitationPolicy,
}

impl DirectStrategy {
    pub fn new(upstream: Option<DynUpstream>, request: GenerateRequest, policy: CitationPolicy) -> Self {
        Self {
            upstream,
            request,
            policy,
        }
    }

    pub fn from_config(cfg: &AiConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            build_upstream(cfg)?,
            prompt::build_request(cfg),
            cfg.citations.policy(),
        ))
    }
}

#[async_trait]
impl NewsStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn ready(&self) -> Result<(), FetchError> {
        match self.upstream {
            Some(_) => Ok(()),
            None => Err(FetchError::Configuration(MISSING_KEY.into())),
        }
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError> {
        let Some(upstream) = &self.upstream else {
            return Err(FetchError::Configuration(MISSING_KEY.into()));
        };
        generate_news(upstream, &self.request, self.policy).await
    }
}
