// src/upstream/gemini.rs
//! Gemini `generateContent` client with optional Google Search grounding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{GenerateRequest, UpstreamClient, UpstreamReply};
use crate::config::ai::Credential;
use crate::error::FetchError;
use crate::news::{SourceCitation, DEFAULT_CITATION_TITLE};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Credential,
    base_url: String,
}

impl GeminiClient {
    /// `base_url` is the REST root without trailing slash. Uses the transport's
    /// default timeouts.
    pub fn new(api_key: Credential, base_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("techinvest-ai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(format!("building http client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: EmptyObject,
}

#[derive(Serialize)]
struct EmptyObject {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<RespContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Deserialize, Default)]
struct RespPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Default)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Deserialize, Default)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

pub(crate) fn build_body(req: &GenerateRequest) -> Value {
    let body = Req {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &req.instruction,
            }],
        }],
        system_instruction: req.system.as_deref().map(|s| Content {
            role: None,
            parts: vec![Part { text: s }],
        }),
        tools: if req.search_grounding {
            vec![Tool {
                google_search: EmptyObject {},
            }]
        } else {
            Vec::new()
        },
        generation_config: GenerationConfig {
            temperature: req.temperature,
            response_mime_type: req.response_schema.as_ref().map(|_| "application/json"),
            response_schema: req.response_schema.as_ref(),
        },
    };
    serde_json::to_value(&body).unwrap_or(Value::Null)
}

/// Concatenated text of the first candidate plus its web citations.
pub(crate) fn reply_from_response(resp: Resp) -> UpstreamReply {
    let Some(first) = resp.candidates.into_iter().next() else {
        return UpstreamReply::default();
    };
    let text = first
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let citations = first
        .grounding_metadata
        .map(|g| g.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.web)
        .filter_map(|w| {
            let uri = w.uri.filter(|u| !u.trim().is_empty())?;
            let title = w
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CITATION_TITLE.to_string());
            Some(SourceCitation { title, uri })
        })
        .collect();
    UpstreamReply { text, citations }
}

#[async_trait]
impl UpstreamClient for GeminiClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<UpstreamReply, FetchError> {
        let body = build_body(req);
        let resp = self
            .http
            .post(self.endpoint(&req.model))
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), &text));
        }

        let parsed: Resp = resp.json().await.map_err(|e| FetchError::from_reqwest(&e))?;
        let reply = reply_from_response(parsed);
        debug!(
            target: "fetch",
            model = %req.model,
            text_len = reply.text.len(),
            citations = reply.citations.len(),
            "gemini reply"
        );
        if reply.text.trim().is_empty() {
            return Err(FetchError::parse("model returned no text", ""));
        }
        Ok(reply)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(schema: bool, search: bool) -> GenerateRequest {
        GenerateRequest {
            model: "m".into(),
            instruction: "find news".into(),
            system: Some("persona".into()),
            response_schema: schema.then(|| json!({"type":"OBJECT"})),
            search_grounding: search,
            temperature: 0.7,
        }
    }

    #[test]
    fn body_with_schema_and_search() {
        let b = build_body(&req(true, true));
        assert_eq!(b["contents"][0]["parts"][0]["text"], "find news");
        assert_eq!(b["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(b["tools"][0]["googleSearch"].is_object());
        assert_eq!(b["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(b["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn body_without_schema_or_search() {
        let b = build_body(&req(false, false));
        assert!(b.get("tools").is_none());
        assert!(b["generationConfig"].get("responseMimeType").is_none());
        assert!(b["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn reply_joins_parts_and_filters_chunks() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "{\"news\":" }, { "text": "[]}" } ] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.test", "title": "A" } },
                    { "retrievedContext": {} },
                    { "web": { "uri": "https://b.test" } },
                    { "web": { "title": "no uri" } }
                ]}
            }]
        });
        let resp: Resp = serde_json::from_value(raw).unwrap();
        let reply = reply_from_response(resp);
        assert_eq!(reply.text, "{\"news\":[]}");
        assert_eq!(reply.citations.len(), 2);
        assert_eq!(reply.citations[1].title, DEFAULT_CITATION_TITLE);
    }

    #[test]
    fn no_candidates_is_empty_reply() {
        let reply = reply_from_response(Resp::default());
        assert!(reply.text.is_empty());
        assert!(reply.citations.is_empty());
    }
}
