//! techinvest: terminal client.
//! Fetches a news batch (proxy first, then a direct model call) and prints cards.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use techinvest_ai::config::{AiConfig, Locale};
use techinvest_ai::error::FetchError;
use techinvest_ai::news::NewsEnvelope;
use techinvest_ai::render;
use techinvest_ai::telemetry::{init_tracing, DEFAULT_LOG_FILTER};
use techinvest_ai::{BoardState, FallbackOrchestrator, NewsBoard};

/// TechInvest AI news client
#[derive(Parser, Debug)]
#[command(name = "techinvest")]
#[command(about = "Curated tech-investment news with technical and plain-language briefings", long_about = None)]
struct Cli {
    /// Config file (overrides $TECHINVEST_CONFIG_PATH and config/techinvest.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proxy URL (overrides config and $TECHINVEST_PROXY_URL)
    #[arg(long)]
    proxy_url: Option<String>,

    /// Output language for messages and card headings: ja | en
    #[arg(long)]
    locale: Option<String>,

    /// Print the batch as a JSON envelope instead of cards
    #[arg(long)]
    json: bool,

    /// Refresh every N seconds instead of exiting after one fetch
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,
}

fn load_config(cli: &Cli) -> anyhow::Result<AiConfig> {
    let mut cfg = match &cli.config {
        Some(p) => AiConfig::load_from_file(p)?.with_env_overrides(),
        None => AiConfig::load_default()?,
    };
    if let Some(url) = &cli.proxy_url {
        cfg.proxy_url = url.clone();
    }
    if let Some(loc) = &cli.locale {
        cfg.locale = Locale::parse(loc).with_context(|| format!("unsupported locale '{loc}'"))?;
    }
    Ok(cfg)
}

fn print_state(state: &BoardState, locale: Locale, json: bool) -> anyhow::Result<bool> {
    match state {
        BoardState::Ready { items, updated_at, .. } => {
            if json {
                let env = NewsEnvelope {
                    news: items.clone(),
                    timestamp: Some(updated_at.to_rfc3339()),
                };
                println!("{}", serde_json::to_string_pretty(&env)?);
            } else {
                let local = updated_at.with_timezone(&chrono::Local).format("%H:%M");
                println!("{local} Updated\n");
                println!("{}", render::cards(items, locale));
            }
            Ok(true)
        }
        BoardState::Failed { message, .. } => {
            eprintln!("{message}");
            eprintln!("[{}]", FetchError::retry_label(locale));
            Ok(false)
        }
        BoardState::Idle => Ok(false),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing(DEFAULT_LOG_FILTER);

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let locale = cfg.locale;

    let orch = Arc::new(FallbackOrchestrator::from_config(&cfg).context("building fetch strategies")?);
    let board = Arc::new(NewsBoard::new(locale));
    info!(target: "techinvest", strategies = ?orch.strategy_names(), proxy = %cfg.proxy_url, "client ready");

    let Some(secs) = cli.watch else {
        board.refresh(&orch).await;
        let ok = print_state(&board.snapshot(), locale, cli.json)?;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    };

    // Each tick issues an independent refresh; the board keeps only the newest result.
    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    loop {
        ticker.tick().await;
        let (orch, board) = (orch.clone(), board.clone());
        let json = cli.json;
        tokio::spawn(async move {
            if board.refresh(&orch).await {
                if let Err(e) = print_state(&board.snapshot(), locale, json) {
                    tracing::warn!(target: "techinvest", error = ?e, "render failed");
                }
            }
        });
    }
}
