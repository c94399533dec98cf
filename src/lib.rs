//! Google News sitemap generator for a single publication's RSS feeds.
//!
//! One run is a straight pipeline: fetch each configured feed in order,
//! parse its items, drop duplicates and anything older than the recency
//! window, sort newest first, and write the sitemap file.
//!
//! ```ignore
//! use news_sitemap::{config::Config, generate};
//!
//! let config = Config::default();
//! let client = reqwest::Client::new();
//! let written = generate(&client, &config, &config.output, chrono::Utc::now()).await?;
//! ```

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod sitemap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use config::Config;
use sitemap::{render_sitemap, write_sitemap, Publication};

/// Builds the sitemap for `config` and writes it to `output`.
///
/// Feed failures never reach the caller; an empty sitemap is still
/// written when no feed yields items. Only rendering or writing the file
/// can fail. Returns the number of `<url>` entries written.
pub async fn generate(
    client: &reqwest::Client,
    config: &Config,
    output: &Path,
    now: DateTime<Utc>,
) -> Result<usize> {
    let items = pipeline::build(client, config, now).await;

    let publication = Publication::new(
        config.publication_name.clone(),
        config.publication_language.clone(),
    );
    let document = render_sitemap(&items, &publication)?;

    write_sitemap(&document, output)
        .await
        .with_context(|| format!("Failed to write sitemap to {}", output.display()))?;

    tracing::info!(path = %output.display(), entries = items.len(), "Sitemap written");
    Ok(items.len())
}
