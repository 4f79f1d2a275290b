/*
marketlens - command-line entry point.
Resolves both endpoints once at startup, runs one operation and prints JSON on stdout.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use marketlens::fallback::{DiagnosticSink, FallbackEvent, RecordingSink, TracingSink};
use marketlens::llm::remote::RemoteLlmProvider;
use marketlens::llm::sentiment::{self, SentimentAnalyzer};
use marketlens::news::finnhub::FinnhubProvider;
use marketlens::news::market::{self, MarketNewsService};

#[derive(Parser, Debug)]
#[command(name = "marketlens", about = "Market sentiment and news with offline fallbacks")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the market sentiment of a piece of text
    Sentiment {
        text: String,
    },
    /// Print general market headlines
    News {
        /// Only print the first N items
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Call both endpoints once and report which ones served live data
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Credentials may live in a local .env file
    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, "loaded environment file");
    }

    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(Some(default_path.as_path()), override_path.as_deref())
        .await
        .context("failed to load configuration")?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // `check` collects fallback events so it can report them per endpoint
    let recorder = Arc::new(RecordingSink::new());
    let sink: Arc<dyn DiagnosticSink> = if matches!(args.command, Command::Check) {
        recorder.clone()
    } else {
        Arc::new(TracingSink)
    };
    let (analyzer, news) = create_services(&config, sink)?;

    match args.command {
        Command::Sentiment { text } => {
            let result = analyzer.analyze_sentiment(&text).await;
            print_json(&result)?;
        }
        Command::News { limit } => {
            let mut items = news.get_market_news().await;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            print_json(&items)?;
        }
        Command::Check => {
            analyzer.analyze_sentiment("Markets are volatile today").await;
            news.get_market_news().await;

            let events = recorder.events();
            let report = serde_json::json!({
                "sentiment": endpoint_status(&events, sentiment::OPERATION),
                "news": endpoint_status(&events, market::OPERATION),
            });
            print_json(&report)?;
        }
    }

    Ok(())
}

/// Build both services from configuration. Credentials are read here, once.
fn create_services(
    config: &Config,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<(SentimentAnalyzer, MarketNewsService)> {
    let sentiment_cfg = config.sentiment();
    let llm = RemoteLlmProvider::from_config(&sentiment_cfg, sentiment_cfg.endpoint()?);
    if !llm.has_credential() {
        info!(
            env = sentiment_cfg.api_key_env.as_deref().unwrap_or(common::DEFAULT_SENTIMENT_KEY_ENV),
            "sentiment credential not set, analysis will use mock data"
        );
    }
    let analyzer = SentimentAnalyzer::new(Arc::new(llm)).with_sink(sink.clone());

    let news_cfg = config.news();
    let finnhub = FinnhubProvider::from_config(&news_cfg, news_cfg.endpoint()?);
    if !finnhub.has_credential() {
        info!(
            env = news_cfg.api_key_env.as_deref().unwrap_or(common::DEFAULT_NEWS_KEY_ENV),
            "news credential not set, headlines will use mock data"
        );
    }
    let news = MarketNewsService::new(Arc::new(finnhub))
        .with_sink(sink)
        .with_category(news_cfg.category())
        .with_fallback_count(news_cfg.fallback_count());

    Ok((analyzer, news))
}

fn endpoint_status(events: &[FallbackEvent], operation: &str) -> serde_json::Value {
    match events.iter().find(|e| e.operation == operation) {
        None => serde_json::json!({ "live": true }),
        Some(event) => serde_json::json!({
            "live": false,
            "kind": event.reason.kind(),
            "reason": event.reason.to_string(),
        }),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
