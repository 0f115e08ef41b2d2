use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::{author_line, Adapter, FetchOptions};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_json, Fetcher};
use crate::normalizer::{clean_text, parse_timestamp};

pub const API_BASE: &str = "https://huggingface.co/api/daily_papers";
const SUMMARY_LEN: usize = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyPaper {
    paper: Paper,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    published_at: Option<serde_json::Value>,
    #[serde(default)]
    num_comments: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    upvotes: Option<u64>,
    #[serde(default)]
    published_at: Option<serde_json::Value>,
    #[serde(default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

/// Daily papers leaderboard; the endpoint returns the top `limit` entries.
pub struct HuggingFaceAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl HuggingFaceAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn top_url(count: usize) -> String {
        format!("{}?limit={}", API_BASE, count)
    }

    fn to_item(&self, entry: DailyPaper) -> Option<FeedItem> {
        let paper = entry.paper;
        let title = clean_text(
            paper.title.as_deref().or(entry.title.as_deref()).unwrap_or_default(),
            None,
        );
        if title.is_empty() || paper.id.is_empty() {
            return None;
        }

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), &paper.id),
            title,
            SourceType::HuggingFace,
            format!("https://huggingface.co/papers/{}", paper.id),
        );
        item.summary = paper
            .summary
            .as_deref()
            .map(|s| clean_text(s, Some(SUMMARY_LEN)))
            .filter(|s| !s.is_empty());
        item.published_at = parse_timestamp(&paper.published_at)
            .or_else(|| parse_timestamp(&entry.published_at));
        item.upvotes = paper.upvotes;
        item.score = paper.upvotes;
        item.comment_count = entry.num_comments;
        item.author = author_line(paper.authors.iter().map(|a| a.name.as_str()));
        item.tags = vec!["Papers".to_string()];
        Some(item)
    }
}

#[async_trait]
impl Adapter for HuggingFaceAdapter {
    fn name(&self) -> &str {
        SourceType::HuggingFace.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let url = Self::top_url(options.count);
        let papers: Vec<DailyPaper> = get_json(self.fetcher.as_ref(), self.name(), &url, &[]).await?;

        let items: Vec<FeedItem> = papers
            .into_iter()
            .filter_map(|entry| self.to_item(entry))
            .take(options.count)
            .collect();

        tracing::info!("[{}] fetched {} items", self.name(), items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{HttpResponse, StubFetcher};

    const PAPERS: &str = r#"[
      {"paper": {"id": "2401.00001", "title": "Scaling  Things", "summary": "We scale\nthings.",
                 "upvotes": 120, "publishedAt": "2024-01-03T10:00:00.000Z",
                 "authors": [{"name": "Ada"}, {"name": "Grace"}]},
       "numComments": 4},
      {"paper": {"id": "2401.00002", "title": "Small Things", "upvotes": 80,
                 "publishedAt": "2024-01-02T10:00:00.000Z", "authors": [{"name": "Linus"}]}},
      {"paper": {"id": "2401.00003", "title": "", "upvotes": 5}}
    ]"#;

    #[tokio::test]
    async fn test_maps_fields() {
        let fetcher = StubFetcher::new().with_body(HuggingFaceAdapter::top_url(5), PAPERS);
        let adapter = HuggingFaceAdapter::new(Arc::new(fetcher));

        let items = adapter.fetch(&FetchOptions::new(5)).await;
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.id, "huggingface-2401.00001");
        assert_eq!(first.title, "Scaling Things");
        assert_eq!(first.url, "https://huggingface.co/papers/2401.00001");
        assert_eq!(first.summary.as_deref(), Some("We scale things."));
        assert_eq!(first.upvotes, Some(120));
        assert_eq!(first.comment_count, Some(4));
        assert_eq!(first.author.as_deref(), Some("Ada et al."));
        assert!(first.published_at.is_some());

        assert_eq!(items[1].author.as_deref(), Some("Linus"));
    }

    #[tokio::test]
    async fn test_http_error_yields_empty() {
        let fetcher = StubFetcher::new().with_response(
            HuggingFaceAdapter::top_url(5),
            HttpResponse::with_status(503, "Service Unavailable"),
        );
        let adapter = HuggingFaceAdapter::new(Arc::new(fetcher));
        assert!(adapter.fetch(&FetchOptions::new(5)).await.is_empty());
        assert!(adapter.fetch_items(&FetchOptions::new(5)).await.is_err());
    }
}
