// src/upstream/mod.rs
//! Upstream AI client abstraction. The concrete client talks to Gemini; tests and
//! `AI_TEST_MODE=mock` use a fixed reply.

pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ai::AiConfig;
use crate::error::FetchError;
use crate::news::SourceCitation;

pub use gemini::GeminiClient;

/// One model call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub instruction: String,
    /// System-level persona.
    pub system: Option<String>,
    /// Strict output schema; `None` means the format lives in `instruction`.
    pub response_schema: Option<Value>,
    pub search_grounding: bool,
    pub temperature: f32,
}

/// Model text plus web citations pulled from grounding metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamReply {
    pub text: String,
    pub citations: Vec<SourceCitation>,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<UpstreamReply, FetchError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynUpstream = Arc<dyn UpstreamClient>;

/// Factory used by both binaries.
///
/// * `AI_TEST_MODE=mock` → [`FixedUpstream`] with a canned one-item batch.
/// * credential present → [`GeminiClient`].
/// * otherwise `None`; callers turn that into a configuration error.
pub fn build_upstream(cfg: &AiConfig) -> Result<Option<DynUpstream>, FetchError> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Some(Arc::new(FixedUpstream::sample())));
    }
    match &cfg.api_key {
        Some(key) => {
            let client = GeminiClient::new(key.clone(), &cfg.base_url)?;
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}

/// Returns the same reply for every request.
#[derive(Debug, Clone)]
pub struct FixedUpstream {
    pub reply: Result<UpstreamReply, FetchError>,
}

impl FixedUpstream {
    pub fn ok(text: impl Into<String>, citations: Vec<SourceCitation>) -> Self {
        Self {
            reply: Ok(UpstreamReply {
                text: text.into(),
                citations,
            }),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self { reply: Err(err) }
    }

    pub fn sample() -> Self {
        let text = r#"```json
{"news":[{"index":1,"topic":"AI","title":"Mock briefing","importance":3,
"technicalSummary":"Deterministic placeholder used in mock mode.",
"simpleSummary":"テスト用のニュースです。","whyWatch":"-","risks":"-","category":"AI / ソフトウェア"}]}
```"#;
        Self::ok(
            text,
            vec![SourceCitation {
                title: "example".into(),
                uri: "https://example.com/".into(),
            }],
        )
    }
}

#[async_trait]
impl UpstreamClient for FixedUpstream {
    async fn generate(&self, _req: &GenerateRequest) -> Result<UpstreamReply, FetchError> {
        self.reply.clone()
    }
    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}
