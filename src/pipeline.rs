//! Feed aggregation: fetch every configured feed in order, then merge,
//! deduplicate, filter by recency and sort the surviving items.
//!
//! Feed-level failures are contained here. Each feed produces a
//! [`FeedResult`]; failures are logged and contribute no items, so the
//! run always yields a (possibly empty) list.

use crate::config::Config;
use crate::feed::{fetch_feed, parse_feed, FeedItem, FetchError, ParseError, ParseResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Why a single feed contributed nothing to the run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Outcome of fetching and parsing one feed.
#[derive(Debug)]
pub struct FeedResult {
    /// Feed URL, for correlation in logs
    pub url: String,
    /// Parsed items, or the reason the feed was skipped
    pub result: Result<ParseResult, FeedError>,
}

/// Merged items plus counts of what was left out.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Unique-by-link items, newest first
    pub items: Vec<FeedItem>,
    /// Items whose link was already taken by an earlier item
    pub duplicates: usize,
    /// Items published before the cutoff
    pub stale: usize,
    /// Items the parser dropped for missing fields or bad dates
    pub unparseable: usize,
    /// Feeds that failed to fetch or parse
    pub failed_feeds: usize,
}

/// Fetches and parses each feed one after another, in list order.
///
/// Never fails as a whole: every feed gets a [`FeedResult`], in the same
/// order as `feeds`. Failures are logged as they happen.
pub async fn collect_feeds(client: &reqwest::Client, feeds: &[String]) -> Vec<FeedResult> {
    let mut results = Vec::with_capacity(feeds.len());

    for url in feeds {
        let result = fetch_and_parse(client, url).await;

        match &result {
            Ok(parsed) => {
                tracing::debug!(feed = %url, items = parsed.items.len(), "Feed parsed");
                if parsed.skipped > 0 {
                    tracing::debug!(
                        feed = %url,
                        skipped = parsed.skipped,
                        "Items without link or valid pubDate skipped"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Error processing feed");
            }
        }

        results.push(FeedResult {
            url: url.clone(),
            result,
        });
    }

    results
}

async fn fetch_and_parse(client: &reqwest::Client, url: &str) -> Result<ParseResult, FeedError> {
    let bytes = fetch_feed(client, url).await?;
    Ok(parse_feed(&bytes)?)
}

/// Merges per-feed results into the final item list.
///
/// Items are visited feed by feed, then in parser order. An item is kept
/// when its link has not been kept before and it was published at or
/// after `cutoff`; a stale item does not claim its link. The kept items
/// are then stably sorted newest first, so equal timestamps stay in
/// encounter order.
pub fn aggregate(results: Vec<FeedResult>, cutoff: DateTime<Utc>) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut seen_links: HashSet<String> = HashSet::new();

    for feed in results {
        let parsed = match feed.result {
            Ok(parsed) => parsed,
            Err(_) => {
                aggregation.failed_feeds += 1;
                continue;
            }
        };
        aggregation.unparseable += parsed.skipped;

        for item in parsed.items {
            if seen_links.contains(&item.link) {
                aggregation.duplicates += 1;
                continue;
            }
            if item.published < cutoff {
                aggregation.stale += 1;
                continue;
            }
            seen_links.insert(item.link.clone());
            aggregation.items.push(item);
        }
    }

    aggregation
        .items
        .sort_by(|a, b| b.published.cmp(&a.published));

    aggregation
}

/// Runs the whole pipeline for `config` relative to `now`.
///
/// The cutoff is `now - recency window`, fixed before the first feed is
/// requested, and clamped to the earliest representable time. Returns an
/// empty list when every feed fails.
pub async fn build(
    client: &reqwest::Client,
    config: &Config,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    // A window reaching past the earliest representable time keeps everything
    let cutoff = now
        .checked_sub_signed(config.recency_window())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let results = collect_feeds(client, &config.feeds).await;
    let total_feeds = results.len();
    let aggregation = aggregate(results, cutoff);

    tracing::info!(
        feeds = total_feeds,
        failed = aggregation.failed_feeds,
        items = aggregation.items.len(),
        duplicates = aggregation.duplicates,
        stale = aggregation.stale,
        unparseable = aggregation.unparseable,
        cutoff = %cutoff.to_rfc3339(),
        "Aggregated feeds"
    );

    aggregation.items
}
