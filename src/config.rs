//! Configuration file parser for `news-sitemap.toml`.
//!
//! The config file is optional — a missing file yields `Config::default()`,
//! which is the Still Listening Magazine setup. Unknown keys are accepted
//! and logged as warnings.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Feeds read when no config file overrides them, in processing order.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.stilllisteningmagazine.com/features?format=rss",
    "https://www.stilllisteningmagazine.com/interviews?format=rss",
    "https://www.stilllisteningmagazine.com/reviews?format=rss",
    "https://www.stilllisteningmagazine.com/gig-reviews?format=rss",
    "https://www.stilllisteningmagazine.com/start-listening-to?format=rss",
];

pub const DEFAULT_PUBLICATION_NAME: &str = "Still Listening Magazine";
pub const DEFAULT_PUBLICATION_LANGUAGE: &str = "en";
pub const DEFAULT_OUTPUT: &str = "news-sitemap.xml";
pub const DEFAULT_CONFIG_FILE: &str = "news-sitemap.toml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Run configuration. Immutable once loaded and handed to the pipeline.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, fetched in this order. Order decides which duplicate wins.
    pub feeds: Vec<String>,

    /// `<news:name>` written for every entry.
    pub publication_name: String,

    /// `<news:language>` written for every entry.
    pub publication_language: String,

    /// Items published more than this many days before the run are left out.
    pub recency_days: u32,

    /// Sitemap destination, relative to the working directory unless absolute.
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            publication_name: DEFAULT_PUBLICATION_NAME.to_string(),
            publication_language: DEFAULT_PUBLICATION_LANGUAGE.to_string(),
            recency_days: 2,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Upper bound on the recency window (about a century).
    pub const MAX_RECENCY_DAYS: u32 = 36_500;

    const KNOWN_KEYS: [&'static str; 5] = [
        "feeds",
        "publication_name",
        "publication_language",
        "recency_days",
        "output",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Feed URLs that are not http(s) → dropped with a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            publication = %config.publication_name,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if !(1..=Self::MAX_RECENCY_DAYS).contains(&self.recency_days) {
            return Err(ConfigError::Invalid {
                key: "recency_days",
                reason: format!("must be between 1 and {}", Self::MAX_RECENCY_DAYS),
            });
        }
        if self.publication_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "publication_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.publication_language.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "publication_language",
                reason: "must not be empty".to_string(),
            });
        }

        self.feeds.retain(|feed| match validate_feed_url(feed) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(url = %feed, error = %reason, "Skipping invalid feed URL");
                false
            }
        });

        Ok(())
    }

    /// Length of the recency window.
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.recency_days))
    }
}

fn validate_feed_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("Unsupported scheme: {} (only http/https allowed)", scheme)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feeds.len(), 5);
        assert_eq!(
            config.feeds[0],
            "https://www.stilllisteningmagazine.com/features?format=rss"
        );
        assert_eq!(
            config.feeds[4],
            "https://www.stilllisteningmagazine.com/start-listening-to?format=rss"
        );
        assert_eq!(config.publication_name, "Still Listening Magazine");
        assert_eq!(config.publication_language, "en");
        assert_eq!(config.recency_days, 2);
        assert_eq!(config.recency_window(), chrono::Duration::days(2));
        assert_eq!(config.output, PathBuf::from("news-sitemap.xml"));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/news_sitemap_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.publication_name, "Still Listening Magazine");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("news_sitemap_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("news-sitemap.toml");
        std::fs::write(&path, "  \n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feeds.len(), 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::from_toml("recency_days = 7\n").unwrap();
        assert_eq!(config.recency_days, 7);
        assert_eq!(config.feeds.len(), 5);
        assert_eq!(config.publication_language, "en");
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("news_sitemap_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("news-sitemap.toml");

        let content = r#"
feeds = [
    "https://example.com/news?format=rss",
    "https://example.com/reviews?format=rss",
]
publication_name = "Example Weekly"
publication_language = "de"
recency_days = 3
output = "public/news-sitemap.xml"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.feeds,
            vec![
                "https://example.com/news?format=rss".to_string(),
                "https://example.com/reviews?format=rss".to_string(),
            ]
        );
        assert_eq!(config.publication_name, "Example Weekly");
        assert_eq!(config.publication_language, "de");
        assert_eq!(config.recency_days, 3);
        assert_eq!(config.output, PathBuf::from("public/news-sitemap.xml"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = Config::from_toml("feeds = [unclosed");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let result = Config::from_toml("recency_days = \"two\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_recency_rejected() {
        let result = Config::from_toml("recency_days = 0");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "recency_days",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_recency_rejected() {
        let result = Config::from_toml("recency_days = 4294967295\nfeeds = []");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "recency_days",
                ..
            })
        ));

        assert!(Config::from_toml("recency_days = 36501").is_err());
        let config = Config::from_toml("recency_days = 36500").unwrap();
        assert_eq!(config.recency_days, Config::MAX_RECENCY_DAYS);
    }

    #[test]
    fn test_blank_publication_name_rejected() {
        let result = Config::from_toml("publication_name = \"  \"");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "publication_name",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_feed_urls_skipped() {
        let content = r#"
feeds = [
    "https://valid.example.com/feed",
    "file:///etc/passwd",
    "not a url",
    "http://also-valid.example.com/rss",
]
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(
            config.feeds,
            vec![
                "https://valid.example.com/feed".to_string(),
                "http://also-valid.example.com/rss".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_feed_list_allowed() {
        let config = Config::from_toml("feeds = []").unwrap();
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = Config::from_toml("theme = \"dark\"\nrecency_days = 4").unwrap();
        assert_eq!(config.recency_days, 4);
    }
}
