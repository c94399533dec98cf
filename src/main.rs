use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use news_sitemap::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "news-sitemap",
    about = "Generate a Google News sitemap from RSS feeds"
)]
struct Args {
    /// Config file (defaults to ./news-sitemap.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output path, overriding the config file
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Feed failures are reported at warn, so show info and above unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // An explicit --config must exist; the default file is optional
    if let Some(path) = &args.config {
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if config.feeds.is_empty() {
        tracing::warn!("No feeds configured, the sitemap will be empty");
    }

    let output = args.output.unwrap_or_else(|| config.output.clone());

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    news_sitemap::generate(&client, &config, &output, Utc::now()).await?;

    Ok(())
}
