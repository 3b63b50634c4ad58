// src/upstream/prompt.rs
//! Prompt construction for the news request. Two interchangeable ways to get JSON
//! back: a strict response schema, or a format instruction embedded in the prompt.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::GenerateRequest;
use crate::config::ai::AiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStrategy {
    /// `responseMimeType=application/json` plus `responseSchema`.
    #[default]
    Schema,
    /// Output format spelled out inside the prompt; reply may contain prose.
    Embedded,
}

pub const DEFAULT_PERSONA: &str = "あなたは世界トップクラスのテック専門投資家です。";

const SCHEMA_INSTRUCTION: &str = "半導体、AI、ロボティクス、EV、量子コンピュータに関する最新の重要投資ニュースを3〜5件探して分析してください。各ニュースには詳細な解説をつけてください。";

const EMBEDDED_INSTRUCTION: &str = r#"Google検索を使用して、半導体、AI、ロボティクス、量子、EVなどの「過去72時間以内」の最新ニュースを3〜5件ピックアップしてください。

各ニュースについて以下のJSON形式で出力してください：
{
  "news": [
    {
      "index": 1,
      "topic": "分野 (AI, 半導体など)",
      "title": "投資家が注目すべきタイトル",
      "importance": 5,
      "technicalSummary": "専門家向けの技術的・経済的影響を3文程度で詳しく要約（ですます調ではなく、硬い口調で）",
      "simpleSummary": "日常生活に例えた、子供でもわかるやさしい解説",
      "affectedEntities": [{ "region": "地域", "entities": ["企業名"] }],
      "whyWatch": "今後の投資判断における最重要ポイント",
      "risks": "懸念されるリスクや技術的課題",
      "category": "カテゴリ"
    }
  ]
}
必ず日本語で、JSONのみを返してください。"#;

/// Gemini `responseSchema` for the news envelope.
pub fn news_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "news": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "index": { "type": "NUMBER" },
                        "topic": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "importance": { "type": "NUMBER" },
                        "technicalSummary": { "type": "STRING" },
                        "simpleSummary": { "type": "STRING" },
                        "affectedEntities": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "region": { "type": "STRING" },
                                    "entities": { "type": "ARRAY", "items": { "type": "STRING" } }
                                }
                            }
                        },
                        "whyWatch": { "type": "STRING" },
                        "risks": { "type": "STRING" },
                        "category": { "type": "STRING" }
                    },
                    "required": [
                        "index", "topic", "title", "importance",
                        "technicalSummary", "simpleSummary", "whyWatch", "risks"
                    ]
                }
            }
        }
    })
}

pub fn build_request(cfg: &AiConfig) -> GenerateRequest {
    let (instruction, response_schema) = match cfg.prompt_strategy {
        PromptStrategy::Schema => (SCHEMA_INSTRUCTION.to_string(), Some(news_response_schema())),
        PromptStrategy::Embedded => (EMBEDDED_INSTRUCTION.to_string(), None),
    };
    GenerateRequest {
        model: cfg.model.clone(),
        instruction,
        system: Some(
            cfg.persona
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
        ),
        response_schema,
        search_grounding: cfg.search_grounding,
        temperature: cfg.temperature,
    }
}
