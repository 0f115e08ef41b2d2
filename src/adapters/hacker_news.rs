use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use crate::adapters::{Adapter, FetchOptions, ProviderOptions};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_json, Fetcher};
use crate::normalizer::{parse_timestamp, summarize_html};

pub const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Candidates fetched per wanted item, since the score filter runs after
/// the detail fetch. Tuned for the front page; it does not guarantee
/// `count` survivors.
pub const OVERFETCH_FACTOR: usize = 3;
/// Upper bound on detail requests per run.
pub const MAX_CANDIDATES: usize = 100;

const SUMMARY_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Story {
    id: u64,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    score: Option<u64>,
    #[serde(default)]
    descendants: Option<u64>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

/// Top stories: ID list first, then one detail request per candidate.
pub struct HackerNewsAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl HackerNewsAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn top_stories_url() -> String {
        format!("{}/topstories.json", API_BASE)
    }

    pub fn item_url(id: u64) -> String {
        format!("{}/item/{}.json", API_BASE, id)
    }

    pub fn candidate_count(count: usize) -> usize {
        count.saturating_mul(OVERFETCH_FACTOR).min(MAX_CANDIDATES)
    }

    async fn fetch_story(&self, id: u64) -> Option<Story> {
        let url = Self::item_url(id);
        match get_json::<Option<Story>>(self.fetcher.as_ref(), self.name(), &url, &[]).await {
            Ok(story) => story,
            Err(e) => {
                tracing::debug!("[{}] item {} skipped: {}", self.name(), id, e);
                None
            }
        }
    }

    fn to_item(&self, story: Story) -> Option<FeedItem> {
        let title = story.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return None;
        }

        let discussion = format!("https://news.ycombinator.com/item?id={}", story.id);
        let url = story
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or(discussion);

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), story.id),
            title,
            SourceType::HackerNews,
            url,
        );
        item.summary = story
            .text
            .as_deref()
            .and_then(|t| summarize_html(t, SUMMARY_LEN));
        item.published_at = parse_timestamp(&story.time);
        item.score = story.score;
        item.comment_count = story.descendants;
        item.author = story.by;
        Some(item)
    }
}

#[async_trait]
impl Adapter for HackerNewsAdapter {
    fn name(&self) -> &str {
        SourceType::HackerNews.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let min_score = match options.provider {
            ProviderOptions::HackerNews { min_score } => u64::from(min_score),
            _ => 0,
        };

        let ids: Vec<u64> = get_json(
            self.fetcher.as_ref(),
            self.name(),
            &Self::top_stories_url(),
            &[],
        )
        .await?;

        let candidates = ids.into_iter().take(Self::candidate_count(options.count));
        let stories = join_all(candidates.map(|id| self.fetch_story(id))).await;

        let items: Vec<FeedItem> = stories
            .into_iter()
            .flatten()
            .filter(|s| !s.dead && !s.deleted)
            .filter(|s| s.kind.as_deref().map_or(true, |k| k == "story"))
            .filter(|s| s.score.unwrap_or(0) >= min_score)
            .filter_map(|s| self.to_item(s))
            .take(options.count)
            .collect();

        tracing::info!(
            "[{}] fetched {} items (min score {})",
            self.name(),
            items.len(),
            min_score
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{HttpResponse, StubFetcher};

    fn story(id: u64, score: u64, extra: &str) -> String {
        format!(
            r#"{{"id": {id}, "type": "story", "title": "Story {id}", "score": {score},
                "by": "pg", "time": 1700000000, "descendants": 7{extra}}}"#
        )
    }

    fn stub_with(ids: &[u64], stories: &[(u64, String)]) -> StubFetcher {
        let ids = serde_json::to_string(ids).unwrap();
        stories.iter().fold(
            StubFetcher::new().with_body(HackerNewsAdapter::top_stories_url(), ids),
            |stub, (id, body)| stub.with_body(HackerNewsAdapter::item_url(*id), body.clone()),
        )
    }

    #[test]
    fn test_candidate_count_is_capped() {
        assert_eq!(HackerNewsAdapter::candidate_count(10), 30);
        assert_eq!(HackerNewsAdapter::candidate_count(50), 100);
        assert_eq!(HackerNewsAdapter::candidate_count(0), 0);
    }

    #[tokio::test]
    async fn test_filters_by_score_and_truncates() {
        let fetcher = stub_with(
            &[1, 2, 3, 4, 5, 6, 7],
            &[
                (1, story(1, 300, r#", "url": "https://a.test/1""#)),
                (2, story(2, 5, "")),
                (3, story(3, 150, r#", "text": "<p>Ask &amp; tell</p>""#)),
                (4, story(4, 200, "")),
            ],
        );
        let fetcher = Arc::new(fetcher);
        let adapter = HackerNewsAdapter::new(fetcher.clone());

        let options =
            FetchOptions::new(2).with_provider(ProviderOptions::HackerNews { min_score: 100 });
        let items = adapter.fetch(&options).await;

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["hackernews-1", "hackernews-3"]);
        assert_eq!(items[0].url, "https://a.test/1");
        assert_eq!(items[1].url, "https://news.ycombinator.com/item?id=3");
        assert_eq!(items[1].summary.as_deref(), Some("Ask & tell"));
        assert_eq!(items[0].comment_count, Some(7));
        assert_eq!(items[0].author.as_deref(), Some("pg"));
        assert_eq!(items[0].published_at.unwrap().timestamp(), 1_700_000_000);

        // 2 wanted * 3 = 6 candidates; the seventh id is never requested.
        let requested = fetcher.requested_urls();
        assert!(requested.contains(&HackerNewsAdapter::item_url(6)));
        assert!(!requested.contains(&HackerNewsAdapter::item_url(7)));
    }

    #[tokio::test]
    async fn test_skips_dead_and_non_story_items() {
        let fetcher = stub_with(
            &[1, 2, 3],
            &[
                (1, story(1, 10, r#", "dead": true"#)),
                (2, r#"{"id": 2, "type": "job", "title": "Hiring", "score": 10}"#.to_string()),
                (3, "null".to_string()),
            ],
        );
        let adapter = HackerNewsAdapter::new(Arc::new(fetcher));
        assert!(adapter.fetch(&FetchOptions::new(5)).await.is_empty());
    }

    #[tokio::test]
    async fn test_id_list_failure_yields_empty() {
        let fetcher = StubFetcher::new().with_response(
            HackerNewsAdapter::top_stories_url(),
            HttpResponse::with_status(500, "Internal Server Error"),
        );
        let adapter = HackerNewsAdapter::new(Arc::new(fetcher));
        assert!(adapter.fetch(&FetchOptions::new(5)).await.is_empty());
    }
}
