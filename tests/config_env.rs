// tests/config_env.rs
use std::{env, fs};

use techinvest_ai::config::ai::{ENV_API_KEYS, ENV_CONFIG_PATH, ENV_LOCALE, ENV_PROXY_URL};
use techinvest_ai::config::{AiConfig, Credential, Locale};
use techinvest_ai::error::ErrorKind;
use techinvest_ai::FallbackOrchestrator;

fn clear_env() {
    for k in ENV_API_KEYS {
        env::remove_var(k);
    }
    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_PROXY_URL);
    env::remove_var(ENV_LOCALE);
    env::remove_var("AI_TEST_MODE");
}

#[test]
fn load_from_file_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("techinvest.toml");
    fs::write(
        &p,
        r#"
model = "gemini-2.5-flash"
proxy_url = "http://proxy.test/api/news"
locale = "en"
search_grounding = false

[citations]
mode = "windowed"
window = 3
"#,
    )
    .unwrap();
    let cfg = AiConfig::load_from_file(&p).unwrap();
    assert_eq!(cfg.model, "gemini-2.5-flash");
    assert_eq!(cfg.proxy_url, "http://proxy.test/api/news");
    assert_eq!(cfg.locale, Locale::En);
    assert!(!cfg.search_grounding);
    assert_eq!(cfg.citations.window, 3);
    assert!(cfg.api_key.is_none(), "keys never come from the file");
}

#[serial_test::serial]
#[test]
fn default_uses_env_path_then_fallbacks() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // No file anywhere → defaults
    let cfg = AiConfig::load_default().unwrap();
    assert_eq!(cfg.model, "gemini-3-flash-preview");

    // ./config/techinvest.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(tmp.path().join("config/techinvest.toml"), r#"model = "from-cwd""#).unwrap();
    assert_eq!(AiConfig::load_default().unwrap().model, "from-cwd");

    // Env path wins
    let p = tmp.path().join("other.toml");
    fs::write(&p, r#"model = "from-env""#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    assert_eq!(AiConfig::load_default().unwrap().model, "from-env");

    // Env path must exist
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(AiConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_and_credential_lookup() {
    clear_env();
    env::set_var(ENV_PROXY_URL, "http://override.test/api/news");
    env::set_var(ENV_LOCALE, "en");
    env::set_var("GEMINI_API_KEY", "gk");

    let cfg = AiConfig::default().with_env_overrides();
    assert_eq!(cfg.proxy_url, "http://override.test/api/news");
    assert_eq!(cfg.locale, Locale::En);
    assert_eq!(cfg.api_key.as_ref().map(Credential::expose), Some("gk"));

    // API_KEY takes precedence
    env::set_var("API_KEY", "primary");
    assert_eq!(Credential::from_env().as_ref().map(Credential::expose), Some("primary"));

    // Placeholder falls through to the next variable
    env::set_var("API_KEY", "undefined");
    assert_eq!(Credential::from_env().as_ref().map(Credential::expose), Some("gk"));

    clear_env();
}

#[tokio::test]
#[serial_test::serial]
async fn placeholder_key_ends_chain_with_configuration_error() {
    clear_env();
    env::set_var("API_KEY", "undefined");

    let cfg = AiConfig {
        // Nothing listens here, so the proxy fails and the keyless direct path ends the chain.
        proxy_url: "http://127.0.0.1:9/api/news".into(),
        ..AiConfig::default()
    }
    .with_env_overrides();
    assert!(cfg.api_key.is_none());

    let orch = FallbackOrchestrator::from_config(&cfg).unwrap();
    assert_eq!(orch.strategy_names(), vec!["proxy", "direct"]);
    let err = orch.fetch_news().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    clear_env();
}
