// src/error.rs
//! Fetch error taxonomy and the localized, user-facing text for each kind.

use thiserror::Error;

use crate::config::ai::Locale;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Credential missing or left at its placeholder value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upstream text could not be turned into a news payload.
    /// `raw_excerpt` is for diagnostics only.
    #[error("parse error: {reason}")]
    Parse { reason: String, raw_excerpt: String },

    /// Proxy unreachable, non-success status, or network failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream rate limit: {0}")]
    RateLimited(String),

    #[error("no news items returned")]
    Empty,
}

/// Stable short names used for metrics labels and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Parse,
    Transport,
    RateLimited,
    Empty,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Parse => "parse",
            ErrorKind::Transport => "transport",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Empty => "empty",
        }
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "resource_exhausted",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "quota",
    "too many requests",
];

/// True when an upstream error text carries one of the known rate-limit markers.
pub fn looks_rate_limited(text: &str) -> bool {
    let t = text.to_ascii_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| t.contains(m)) || carries_429_code(&t)
}

/// `429` counts only as the value of a `code`/`status` token (`"code": 429`,
/// `status 429`), never as bare digits inside ids or URLs.
fn carries_429_code(lower: &str) -> bool {
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens
        .windows(2)
        .any(|w| matches!(w[0], "code" | "status") && w[1] == "429")
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Configuration(_) => ErrorKind::Configuration,
            FetchError::Parse { .. } => ErrorKind::Parse,
            FetchError::Transport(_) => ErrorKind::Transport,
            FetchError::RateLimited(_) => ErrorKind::RateLimited,
            FetchError::Empty => ErrorKind::Empty,
        }
    }

    pub fn parse(reason: impl Into<String>, raw: &str) -> Self {
        FetchError::Parse {
            reason: reason.into(),
            raw_excerpt: excerpt(raw, 200),
        }
    }

    /// Classify a failed upstream/proxy exchange. 429 or rate-limit wording in the
    /// body becomes `RateLimited`; anything else is `Transport`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {status}: {}", excerpt(body, 200));
        if status == 429 || looks_rate_limited(body) {
            FetchError::RateLimited(detail)
        } else {
            FetchError::Transport(detail)
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(429) {
            return FetchError::RateLimited(err.to_string());
        }
        if err.is_decode() {
            return FetchError::parse(format!("body decode failed: {err}"), "");
        }
        FetchError::Transport(err.to_string())
    }

    /// Localized message for end users. Never includes upstream diagnostics.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        match (locale, self.kind()) {
            (Locale::Ja, ErrorKind::Configuration) => {
                "APIキーが設定されていません。環境変数 API_KEY を確認してください。"
            }
            (Locale::Ja, ErrorKind::RateLimited) => {
                "AIの利用上限に達しました。しばらく待ってから再試行してください。"
            }
            (Locale::Ja, ErrorKind::Parse) | (Locale::Ja, ErrorKind::Empty) => {
                "ニュースが見つかりませんでした。"
            }
            (Locale::Ja, ErrorKind::Transport) => "通信エラーが発生しました。",
            (Locale::En, ErrorKind::Configuration) => {
                "No API key is configured. Check the API_KEY environment variable."
            }
            (Locale::En, ErrorKind::RateLimited) => {
                "The AI usage limit was reached. Please wait a moment and retry."
            }
            (Locale::En, ErrorKind::Parse) | (Locale::En, ErrorKind::Empty) => {
                "No news could be found."
            }
            (Locale::En, ErrorKind::Transport) => "A communication error occurred.",
        }
    }

    /// Label for the manual retry action shown next to the message.
    pub fn retry_label(locale: Locale) -> &'static str {
        match locale {
            Locale::Ja => "再試行",
            Locale::En => "Retry",
        }
    }
}

/// First `max` chars of `s`, single-lined.
pub(crate) fn excerpt(s: &str, max: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(max)
        .collect();
    flat.trim().to_string()
}
