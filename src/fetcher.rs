use crate::types::{NewsItem, PipelineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Fixed category -> feed URL table driven by the daily schedule.
pub const CATEGORY_FEEDS: &[(&str, &str)] = &[
    ("politics", "https://feeds.bbci.co.uk/news/politics/rss.xml"),
    ("technology", "https://feeds.bbci.co.uk/news/technology/rss.xml"),
    ("business", "https://feeds.bbci.co.uk/news/business/rss.xml"),
    ("sports", "https://feeds.bbci.co.uk/sport/rss.xml"),
    ("health", "https://feeds.bbci.co.uk/news/health/rss.xml"),
    (
        "entertainment",
        "https://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml",
    ),
    ("world", "https://feeds.bbci.co.uk/news/world/rss.xml"),
    (
        "science",
        "https://feeds.bbci.co.uk/news/science_and_environment/rss.xml",
    ),
    ("education", "https://feeds.bbci.co.uk/news/education/rss.xml"),
    ("culture", "https://feeds.npr.org/1008/rss.xml"),
    ("travel", "http://rss.cnn.com/rss/edition_travel.rss"),
    ("lifestyle", "https://feeds.npr.org/1053/rss.xml"),
];

pub fn all_categories() -> Vec<String> {
    CATEGORY_FEEDS.iter().map(|(c, _)| c.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "daily-news-pipeline/0.1".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Source of category-tagged news items.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch up to `count` items for one category. A failure here covers a
    /// single feed only.
    async fn fetch_category(&self, category: &str, count: usize) -> Result<Vec<NewsItem>>;

    /// Fetch every category in order. A failing feed is logged and skipped
    /// so the remaining categories still come back. No retries.
    async fn fetch_batch(&self, categories: &[String], per_category: usize) -> Vec<NewsItem> {
        let mut items = Vec::new();
        for category in categories {
            match self.fetch_category(category, per_category).await {
                Ok(mut fetched) => {
                    debug!("Fetched {} items for category {}", fetched.len(), category);
                    items.append(&mut fetched);
                }
                Err(e) => {
                    warn!("Skipping category {}: {}", category, e);
                }
            }
        }
        items
    }
}

pub struct RssFetcher {
    client: Client,
    feeds: Vec<(String, String)>,
}

impl RssFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let feeds = CATEGORY_FEEDS
            .iter()
            .map(|(c, u)| (c.to_string(), u.to_string()))
            .collect();
        Self::with_feeds(config, feeds)
    }

    /// Construct against an explicit feed table instead of the built-in one.
    pub fn with_feeds(config: FetchConfig, feeds: Vec<(String, String)>) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, feeds }
    }

    fn feed_url(&self, category: &str) -> Option<&str> {
        self.feeds
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, u)| u.as_str())
    }
}

/// Map raw feed content onto `NewsItem`s, taking the first `count` entries.
pub(crate) fn items_from_feed(
    content: &[u8],
    category: &str,
    count: usize,
    feed_url: &str,
) -> Result<Vec<NewsItem>> {
    let feed = parser::parse(content)
        .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {e}")))?;

    let source = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            Url::parse(feed_url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
        })
        .unwrap_or_else(|| feed_url.to_string());

    let items = feed
        .entries
        .into_iter()
        .take(count)
        .map(|entry| NewsItem {
            title: entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string()),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| feed_url.to_string()),
            published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
            description: entry.summary.map(|s| s.content).unwrap_or_default(),
            source: source.clone(),
            category: category.to_string(),
        })
        .collect();

    Ok(items)
}

#[async_trait]
impl NewsSource for RssFetcher {
    async fn fetch_category(&self, category: &str, count: usize) -> Result<Vec<NewsItem>> {
        let url = self
            .feed_url(category)
            .ok_or_else(|| PipelineError::UnknownCategory(category.to_string()))?
            .to_string();

        debug!("Fetching feed for category {}: {}", category, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content = response.bytes().await?;
        let items = items_from_feed(&content, category, count, &url)?;

        info!(
            "Fetched {} items for category {} from {}",
            items.len(),
            category,
            url
        );
        Ok(items)
    }
}
