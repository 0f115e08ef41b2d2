//! Provider adapters and the registry that fans out across them.
//!
//! Every adapter implements [`Adapter::fetch_items`]; callers normally go
//! through [`Adapter::fetch`], which never fails: an upstream error is
//! logged and becomes an empty result.

pub mod arxiv;
pub mod devto;
pub mod github;
pub mod hacker_news;
pub mod huggingface;
pub mod product_hunt;
pub mod reddit;
pub mod registry;
pub mod rss;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{FeedItem, SourceConfig, SourceType, TimeRange};
use crate::fetcher::Fetcher;

pub use arxiv::ArxivAdapter;
pub use devto::DevToAdapter;
pub use github::GitHubAdapter;
pub use hacker_news::HackerNewsAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use product_hunt::ProductHuntAdapter;
pub use reddit::RedditAdapter;
pub use registry::SourceRegistry;
pub use rss::RssAdapter;

/// User-Agent for providers that reject anonymous clients.
pub const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; confluence/",
    env!("CARGO_PKG_VERSION"),
    "; feed aggregator)"
);

/// Provider-specific knobs, one variant per provider that has any.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProviderOptions {
    #[default]
    Default,
    HackerNews {
        min_score: u32,
    },
    ArXiv {
        query: String,
    },
    GitHub {
        language: Option<String>,
    },
    Reddit {
        subreddit: String,
    },
    Rss {
        url: String,
        display_name: Option<String>,
        time_range: Option<TimeRange>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub count: usize,
    pub provider: ProviderOptions,
}

impl FetchOptions {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            provider: ProviderOptions::Default,
        }
    }

    pub fn with_provider(mut self, provider: ProviderOptions) -> Self {
        self.provider = provider;
        self
    }

    /// Options for one configured source.
    pub fn for_source(source: &SourceConfig) -> Self {
        let provider = match source.source_type {
            SourceType::HackerNews => ProviderOptions::HackerNews {
                min_score: source.min_score.unwrap_or(0),
            },
            SourceType::ArXiv => ProviderOptions::ArXiv {
                query: source
                    .query
                    .clone()
                    .unwrap_or_else(|| arxiv::DEFAULT_QUERY.to_string()),
            },
            SourceType::GitHub => ProviderOptions::GitHub {
                language: source.query.clone(),
            },
            SourceType::Reddit => ProviderOptions::Reddit {
                subreddit: source
                    .query
                    .clone()
                    .unwrap_or_else(|| reddit::DEFAULT_SUBREDDIT.to_string()),
            },
            SourceType::Rss | SourceType::Custom => ProviderOptions::Rss {
                url: source.url.clone().unwrap_or_default(),
                display_name: source.name.clone(),
                time_range: source.time_range,
            },
            SourceType::HuggingFace | SourceType::ProductHunt | SourceType::DevTo => {
                ProviderOptions::Default
            }
        };

        Self {
            count: source.count,
            provider,
        }
    }
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Registry name; unique per process.
    fn name(&self) -> &str;

    /// Fetch and normalize up to `options.count` items.
    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>>;

    /// [`fetch_items`](Adapter::fetch_items) with ordinary failures logged
    /// and turned into an empty result.
    async fn fetch(&self, options: &FetchOptions) -> Vec<FeedItem> {
        with_fallback(self.name(), self.fetch_items(options), Vec::new()).await
    }
}

/// Await `operation`; on error, log it against `source_name` and return `fallback`.
pub async fn with_fallback<T, F>(source_name: &str, operation: F, fallback: T) -> T
where
    F: Future<Output = Result<T>>,
{
    match operation.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("[{}] fetch failed: {}", source_name, e);
            fallback
        }
    }
}

/// "First Author" or "First Author et al."
pub(crate) fn author_line<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let names: Vec<&str> = names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    match names.as_slice() {
        [] => None,
        [only] => Some(only.to_string()),
        [first, ..] => Some(format!("{} et al.", first)),
    }
}

/// Every built-in adapter, sharing one fetcher.
pub fn default_adapters(fetcher: Arc<dyn Fetcher>) -> Vec<Arc<dyn Adapter>> {
    vec![
        Arc::new(HuggingFaceAdapter::new(fetcher.clone())),
        Arc::new(HackerNewsAdapter::new(fetcher.clone())),
        Arc::new(ArxivAdapter::new(fetcher.clone())),
        Arc::new(GitHubAdapter::new(fetcher.clone())),
        Arc::new(ProductHuntAdapter::new(fetcher.clone())),
        Arc::new(RedditAdapter::new(fetcher.clone())),
        Arc::new(DevToAdapter::new(fetcher.clone())),
        Arc::new(RssAdapter::new(fetcher)),
    ]
}
