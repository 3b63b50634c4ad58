// src/config/ai.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{env, fmt, fs, path::Path, path::PathBuf};

use crate::normalize::CitationPolicy;
use crate::upstream::prompt::PromptStrategy;

pub const DEFAULT_CONFIG_PATH: &str = "config/techinvest.toml";
pub const ENV_CONFIG_PATH: &str = "TECHINVEST_CONFIG_PATH";
pub const ENV_PROXY_URL: &str = "TECHINVEST_PROXY_URL";
pub const ENV_MODEL: &str = "TECHINVEST_MODEL";
pub const ENV_LOCALE: &str = "TECHINVEST_LOCALE";

/// Credential env vars, in lookup order.
pub const ENV_API_KEYS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Value bundlers substitute when the variable was never defined at build time.
const PLACEHOLDER_KEY: &str = "undefined";

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_proxy_url() -> String {
    "http://127.0.0.1:8000/api/news".to_string()
}
fn default_true() -> bool {
    true
}
fn default_window() -> usize {
    2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ja" | "ja-jp" | "jp" => Some(Locale::Ja),
            "en" | "en-us" | "en-gb" => Some(Locale::En),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CitationMode {
    #[default]
    Windowed,
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationConfig {
    #[serde(default)]
    pub mode: CitationMode,
    /// Citations per item in windowed mode.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            mode: CitationMode::Windowed,
            window: default_window(),
        }
    }
}

impl CitationConfig {
    pub fn policy(&self) -> CitationPolicy {
        match self.mode {
            CitationMode::Shared => CitationPolicy::Shared,
            CitationMode::Windowed => CitationPolicy::Windowed {
                size: self.window.max(1),
            },
        }
    }
}

/// API key for the upstream model. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for absent, blank, or placeholder values.
    pub fn from_raw(raw: Option<String>) -> Option<Self> {
        let v = raw?.trim().to_string();
        if v.is_empty() || v.eq_ignore_ascii_case(PLACEHOLDER_KEY) {
            return None;
        }
        Some(Self(v))
    }

    pub fn from_env() -> Option<Self> {
        ENV_API_KEYS
            .iter()
            .find_map(|name| Self::from_raw(env::var(name).ok()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(len={})", self.0.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Gemini REST root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Attach the `googleSearch` tool to upstream requests.
    #[serde(default = "default_true")]
    pub search_grounding: bool,
    #[serde(default)]
    pub prompt_strategy: PromptStrategy,
    #[serde(default)]
    pub citations: CitationConfig,
    #[serde(default)]
    pub locale: Locale,
    /// System persona override; the built-in investor persona is used when absent.
    #[serde(default)]
    pub persona: Option<String>,
    /// Resolved from the environment, never read from the file.
    #[serde(skip)]
    pub api_key: Option<Credential>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            proxy_url: default_proxy_url(),
            search_grounding: true,
            prompt_strategy: PromptStrategy::default(),
            citations: CitationConfig::default(),
            locale: Locale::default(),
            persona: None,
            api_key: None,
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AiConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolve the config file and apply environment overrides:
    /// 1) $TECHINVEST_CONFIG_PATH (must exist)
    /// 2) config/techinvest.toml
    /// 3) built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        let cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from_file(&pb)?
            } else {
                Self::default()
            }
        };
        Ok(cfg.with_env_overrides())
    }

    /// Env overrides plus credential resolution.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(ENV_PROXY_URL) {
            self.proxy_url = url;
        }
        if let Some(model) = non_empty_env(ENV_MODEL) {
            self.model = model;
        }
        if let Some(loc) = non_empty_env(ENV_LOCALE).and_then(|s| Locale::parse(&s)) {
            self.locale = loc;
        }
        self.api_key = Credential::from_env();
        self.sanitized()
    }

    pub fn with_credential(mut self, key: Option<Credential>) -> Self {
        self.api_key = key;
        self
    }

    fn sanitized(mut self) -> Self {
        if !(0.0..=2.0).contains(&self.temperature) || self.temperature.is_nan() {
            self.temperature = default_temperature();
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if self.citations.window == 0 {
            self.citations.window = default_window();
        }
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
