use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use url::Url;

use crate::adapters::{Adapter, FetchOptions};
use crate::app::{ConfluenceError, Result};
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_ok, Fetcher};
use crate::normalizer::{clean_text, parse_syndication, summarize_html, SyndicationEntry};

pub const FEED_URL: &str = "https://www.producthunt.com/feed";
const SUMMARY_LEN: usize = 200;

/// Ways of reaching the feed, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStrategy {
    Direct,
    /// AllOrigins wraps the upstream body in `{"contents": "..."}`.
    AllOrigins,
    /// corsproxy.io returns the upstream body unchanged.
    CorsProxy,
}

impl ProxyStrategy {
    pub const ORDER: [ProxyStrategy; 3] = [
        ProxyStrategy::Direct,
        ProxyStrategy::AllOrigins,
        ProxyStrategy::CorsProxy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProxyStrategy::Direct => "direct",
            ProxyStrategy::AllOrigins => "allorigins",
            ProxyStrategy::CorsProxy => "corsproxy",
        }
    }

    pub fn request_url(&self, target: &str) -> Result<String> {
        let url = match self {
            ProxyStrategy::Direct => return Ok(target.to_string()),
            ProxyStrategy::AllOrigins => {
                Url::parse_with_params("https://api.allorigins.win/get", &[("url", target)])?
            }
            ProxyStrategy::CorsProxy => {
                Url::parse_with_params("https://corsproxy.io/", &[("url", target)])?
            }
        };
        Ok(url.into())
    }

    /// Unwrap the proxy's response shape into the feed document.
    pub fn extract_body(&self, body: String) -> Result<String> {
        #[derive(Deserialize)]
        struct Wrapped {
            contents: Option<String>,
        }

        match self {
            ProxyStrategy::Direct | ProxyStrategy::CorsProxy => Ok(body),
            ProxyStrategy::AllOrigins => serde_json::from_str::<Wrapped>(&body)?
                .contents
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ConfluenceError::Parse("proxy response has no contents".into())),
        }
    }
}

/// Product launches from the public feed, which is often blocked for
/// direct access and so is retried through public proxies.
pub struct ProductHuntAdapter {
    fetcher: Arc<dyn Fetcher>,
    strategies: Vec<ProxyStrategy>,
}

impl ProductHuntAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_strategies(fetcher, ProxyStrategy::ORDER.to_vec())
    }

    pub fn with_strategies(fetcher: Arc<dyn Fetcher>, strategies: Vec<ProxyStrategy>) -> Self {
        Self {
            fetcher,
            strategies,
        }
    }

    async fn fetch_via(&self, strategy: ProxyStrategy) -> Result<Vec<SyndicationEntry>> {
        let url = strategy.request_url(FEED_URL)?;
        let body = get_ok(self.fetcher.as_ref(), self.name(), &url, &[]).await?;
        let document = strategy.extract_body(body)?;
        parse_syndication(document.as_bytes())
    }

    /// All strategies are attempted at once; the first success in priority
    /// order wins and the error lists every attempt.
    async fn fetch_entries(&self) -> Result<Vec<SyndicationEntry>> {
        let attempts = join_all(self.strategies.iter().map(|s| self.fetch_via(*s))).await;

        let mut failures = Vec::with_capacity(attempts.len());
        for (strategy, attempt) in self.strategies.iter().zip(attempts) {
            match attempt {
                Ok(entries) => {
                    tracing::debug!("[{}] feed reached via {}", self.name(), strategy.label());
                    return Ok(entries);
                }
                Err(e) => {
                    tracing::warn!("[{}] {} failed: {}", self.name(), strategy.label(), e);
                    failures.push(format!("{}: {}", strategy.label(), e));
                }
            }
        }
        Err(ConfluenceError::AllProxiesFailed(failures))
    }

    fn to_item(&self, entry: SyndicationEntry) -> Option<FeedItem> {
        let title = clean_text(&entry.title, None);
        if title.is_empty() || entry.link.is_empty() {
            return None;
        }

        let local_id = entry
            .id
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&entry.id)
            .to_string();

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), local_id),
            title,
            SourceType::ProductHunt,
            entry.link,
        );
        item.summary = entry
            .body
            .as_deref()
            .and_then(|body| summarize_html(body, SUMMARY_LEN));
        item.published_at = entry.published_at;
        item.author = entry.author.filter(|a| !a.trim().is_empty());
        item.tags = entry.categories;
        Some(item)
    }
}

#[async_trait]
impl Adapter for ProductHuntAdapter {
    fn name(&self) -> &str {
        SourceType::ProductHunt.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let entries = self.fetch_entries().await?;
        let items: Vec<FeedItem> = entries
            .into_iter()
            .filter_map(|entry| self.to_item(entry))
            .take(options.count)
            .collect();

        tracing::info!("[{}] fetched {} items", self.name(), items.len());
        Ok(items)
    }
}
