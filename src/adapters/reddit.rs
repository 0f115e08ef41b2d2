use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::{Adapter, FetchOptions, ProviderOptions, BROWSER_USER_AGENT};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_json, Fetcher};
use crate::normalizer::{clean_text, parse_timestamp};

pub const DEFAULT_SUBREDDIT: &str = "programming";
const SUMMARY_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    ups: Option<i64>,
    #[serde(default)]
    num_comments: Option<u64>,
    #[serde(default)]
    created_utc: Option<f64>,
}

/// Hot listing of one subreddit.
pub struct RedditAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl RedditAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn hot_url(subreddit: &str, count: usize) -> String {
        format!(
            "https://www.reddit.com/r/{}/hot.json?limit={}",
            normalize_subreddit(subreddit),
            count
        )
    }

    fn to_item(&self, post: Post, tag: &str) -> Option<FeedItem> {
        let title = clean_text(&post.title, None);
        if title.is_empty() {
            return None;
        }

        let discussion = post
            .permalink
            .as_deref()
            .map(|p| format!("https://www.reddit.com{}", p));
        let link = if post.is_self {
            None
        } else {
            post.url.filter(|u| !u.is_empty())
        };
        let url = link.or(discussion)?;

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), &post.id),
            title,
            SourceType::Reddit,
            url,
        );
        item.summary = Some(clean_text(&post.selftext, Some(SUMMARY_LEN))).filter(|s| !s.is_empty());
        item.published_at = parse_timestamp(&post.created_utc);
        item.score = post.score.and_then(|s| u64::try_from(s).ok());
        item.upvotes = post.ups.and_then(|s| u64::try_from(s).ok());
        item.comment_count = post.num_comments;
        item.author = post.author;
        item.tags = vec![tag.to_string()];
        Some(item)
    }
}

/// Accepts `rust`, `r/rust` or `/r/rust/`.
pub fn normalize_subreddit(subreddit: &str) -> &str {
    let trimmed = subreddit.trim().trim_matches('/');
    trimmed.strip_prefix("r/").unwrap_or(trimmed)
}

#[async_trait]
impl Adapter for RedditAdapter {
    fn name(&self) -> &str {
        SourceType::Reddit.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let subreddit = match &options.provider {
            ProviderOptions::Reddit { subreddit } if !subreddit.trim().is_empty() => {
                normalize_subreddit(subreddit)
            }
            _ => DEFAULT_SUBREDDIT,
        };

        let url = Self::hot_url(subreddit, options.count);
        let headers = [("User-Agent", BROWSER_USER_AGENT)];
        let listing: Listing = get_json(self.fetcher.as_ref(), self.name(), &url, &headers).await?;

        let tag = format!("r/{}", subreddit);
        let items: Vec<FeedItem> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .filter(|post| !post.stickied)
            .filter(|post| !(post.is_self && post.selftext.trim().is_empty()))
            .filter_map(|post| self.to_item(post, &tag))
            .take(options.count)
            .collect();

        tracing::info!("[{}] fetched {} items from {}", self.name(), items.len(), tag);
        Ok(items)
    }
}
