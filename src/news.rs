// src/news.rs
//! News batch data model shared by the proxy, the fallback client and the renderer.
//! Wire names are camelCase so proxy envelopes stay compatible with browser clients.

use serde::{Deserialize, Deserializer, Serialize};

/// Label used when a grounding chunk carries a URI but no title.
pub const DEFAULT_CITATION_TITLE: &str = "参考ソース";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AffectedEntity {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub region: String,
    #[serde(default)]
    pub entities: Vec<String>,
}

/// A web source that informed the model's answer. Only ever built from grounding
/// metadata (or carried through from a proxy envelope).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCitation {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub index: i64,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub topic: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub title: String,
    /// Nominally 1..=5. Not validated here; see [`NewsItem::stars`].
    #[serde(default, deserialize_with = "de_lenient_int")]
    pub importance: i64,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub technical_summary: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub simple_summary: String,
    #[serde(default, deserialize_with = "de_null_as_empty")]
    pub affected_entities: Vec<AffectedEntity>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub why_watch: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub risks: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "de_null_as_empty")]
    pub source_urls: Vec<SourceCitation>,
}

impl NewsItem {
    /// Importance clamped into 1..=5 for star rendering.
    pub fn stars(&self) -> u8 {
        self.importance.clamp(1, 5) as u8
    }

    pub fn tech_category(&self) -> Option<TechCategory> {
        TechCategory::from_label(&self.category)
            .or_else(|| TechCategory::from_label(&self.topic))
    }
}

/// Proxy success body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewsEnvelope {
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl NewsEnvelope {
    pub fn stamped(news: Vec<NewsItem>) -> Self {
        Self {
            news,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Proxy failure body (`{ error, message }`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProxyErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechCategory {
    Ai,
    Semiconductor,
    Cloud,
    Ev,
    Quantum,
    Web3,
    Robotics,
}

impl TechCategory {
    pub const ALL: [TechCategory; 7] = [
        TechCategory::Ai,
        TechCategory::Semiconductor,
        TechCategory::Cloud,
        TechCategory::Ev,
        TechCategory::Quantum,
        TechCategory::Web3,
        TechCategory::Robotics,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TechCategory::Ai => "AI / ソフトウェア",
            TechCategory::Semiconductor => "半導体 / ハードウェア",
            TechCategory::Cloud => "クラウド / インフラ",
            TechCategory::Ev => "EV / クリーンエネルギー",
            TechCategory::Quantum => "量子 / 先端技術",
            TechCategory::Web3 => "Web3 / 暗号資産",
            TechCategory::Robotics => "ロボティクス / オートメーション",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            TechCategory::Ai => &["ai", "ソフトウェア", "software", "人工知能", "llm"],
            TechCategory::Semiconductor => &["半導体", "semiconductor", "chip", "ハードウェア", "hardware"],
            TechCategory::Cloud => &["クラウド", "cloud", "インフラ", "infra", "データセンター"],
            TechCategory::Ev => &["ev", "電気自動車", "クリーンエネルギー", "clean energy", "battery", "電池"],
            TechCategory::Quantum => &["量子", "quantum", "先端技術"],
            TechCategory::Web3 => &["web3", "暗号資産", "crypto", "blockchain", "ブロックチェーン"],
            TechCategory::Robotics => &["ロボ", "robot", "オートメーション", "automation"],
        }
    }

    /// Best-effort classification of a free-form label produced by the model.
    pub fn from_label(label: &str) -> Option<Self> {
        let l = label.trim().to_lowercase();
        if l.is_empty() {
            return None;
        }
        if let Some(c) = Self::ALL.into_iter().find(|c| c.label().to_lowercase() == l) {
            return Some(c);
        }
        // Robotics/Quantum first so "ai" inside longer words doesn't win.
        let order = [
            TechCategory::Robotics,
            TechCategory::Quantum,
            TechCategory::Semiconductor,
            TechCategory::Cloud,
            TechCategory::Web3,
            TechCategory::Ev,
            TechCategory::Ai,
        ];
        order.into_iter().find(|c| {
            c.keywords().iter().any(|k| {
                if k.is_ascii() && k.len() <= 3 {
                    // short ASCII keys ("ai", "ev") must match a whole word
                    l.split(|ch: char| !ch.is_ascii_alphanumeric())
                        .any(|w| w == *k)
                } else {
                    l.contains(k)
                }
            })
        })
    }
}

// ------------------------------------------------------------
// Lenient decoding helpers
// ------------------------------------------------------------

/// The response schema declares NUMBER, so models sometimes emit `4.0` or `"4"`.
fn de_lenient_int<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .unwrap_or(0),
        _ => 0,
    })
}

/// Models emit `null`, numbers and occasionally lists where a string is declared.
fn de_lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::Null | serde_json::Value::Object(_) => String::new(),
    })
}

fn de_null_as_empty<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(de)?.unwrap_or_default())
}
