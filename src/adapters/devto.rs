use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::{Adapter, FetchOptions};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_json, Fetcher};
use crate::normalizer::{clean_text, parse_timestamp};

pub const API_BASE: &str = "https://dev.to/api/articles";
/// Ranking window, in days, for the `top` sort.
pub const TOP_DAYS: u32 = 7;
const SUMMARY_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Article {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    tag_list: Vec<String>,
    #[serde(default)]
    positive_reactions_count: Option<u64>,
    #[serde(default)]
    public_reactions_count: Option<u64>,
    #[serde(default)]
    comments_count: Option<u64>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

pub struct DevToAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl DevToAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn top_url(count: usize) -> String {
        format!("{}?top={}&per_page={}", API_BASE, TOP_DAYS, count)
    }

    fn to_item(&self, article: Article) -> Option<FeedItem> {
        let title = clean_text(&article.title, None);
        if title.is_empty() || article.url.is_empty() {
            return None;
        }

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), article.id),
            title,
            SourceType::DevTo,
            article.url,
        );
        item.summary = article
            .description
            .as_deref()
            .map(|d| clean_text(d, Some(SUMMARY_LEN)))
            .filter(|d| !d.is_empty());
        item.published_at = article.published_at.as_deref().and_then(|p| parse_timestamp(p));
        item.score = article
            .positive_reactions_count
            .or(article.public_reactions_count);
        item.comment_count = article.comments_count;
        item.author = article.user.and_then(|u| u.name.or(u.username));
        item.tags = article.tag_list;
        Some(item)
    }
}

#[async_trait]
impl Adapter for DevToAdapter {
    fn name(&self) -> &str {
        SourceType::DevTo.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let url = Self::top_url(options.count);
        let articles: Vec<Article> = get_json(self.fetcher.as_ref(), self.name(), &url, &[]).await?;

        let items: Vec<FeedItem> = articles
            .into_iter()
            .filter_map(|article| self.to_item(article))
            .take(options.count)
            .collect();

        tracing::info!("[{}] fetched {} items", self.name(), items.len());
        Ok(items)
    }
}
