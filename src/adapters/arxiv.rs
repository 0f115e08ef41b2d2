use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::adapters::{author_line, Adapter, FetchOptions, ProviderOptions};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_ok, Fetcher};
use crate::normalizer::{
    clean_text, ensure_array, extract_link, extract_text, parse_timestamp, parse_xml, XmlNode,
};

pub const API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_QUERY: &str = "cat:cs.AI";
const SUMMARY_LEN: usize = 300;

/// Preprint search, newest submissions first.
pub struct ArxivAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl ArxivAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn search_url(query: &str, count: usize) -> Result<String> {
        let url = Url::parse_with_params(
            API_URL,
            &[
                ("search_query", query),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("start", "0"),
                ("max_results", &count.to_string()),
            ],
        )?;
        Ok(url.into())
    }

    fn to_item(&self, entry: &XmlNode) -> Option<FeedItem> {
        let canonical_id = extract_text(entry.get("id"));
        let short_id = short_id(&canonical_id)?;
        let title = clean_text(&extract_text(entry.get("title")), None);
        if title.is_empty() {
            return None;
        }

        let link = match extract_link(entry.get("link")) {
            l if l.is_empty() => canonical_id.trim().to_string(),
            l => l,
        };

        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), short_id),
            title,
            SourceType::ArXiv,
            link,
        );
        item.summary = Some(clean_text(&extract_text(entry.get("summary")), Some(SUMMARY_LEN)))
            .filter(|s| !s.is_empty());
        item.published_at = parse_timestamp(extract_text(entry.get("published")).as_str())
            .or_else(|| parse_timestamp(extract_text(entry.get("updated")).as_str()));

        let authors: Vec<String> = ensure_array(entry.get("author"))
            .into_iter()
            .map(|a| extract_text(a.get("name")))
            .collect();
        item.author = author_line(authors.iter().map(String::as_str));

        let mut tags: Vec<String> = Vec::new();
        for category in ensure_array(entry.get("category")) {
            if let Some(tag) = category.attr("term").and_then(category_label) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        item.tags = tags;
        Some(item)
    }
}

/// Tail segment of the canonical id URL: `http://arxiv.org/abs/2401.01234v1` → `2401.01234v1`.
pub fn short_id(canonical: &str) -> Option<&str> {
    canonical
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Final dot-segment of a category term: `cs.AI` → `AI`.
pub fn category_label(term: &str) -> Option<String> {
    term.rsplit('.')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Adapter for ArxivAdapter {
    fn name(&self) -> &str {
        SourceType::ArXiv.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let query = match &options.provider {
            ProviderOptions::ArXiv { query } if !query.trim().is_empty() => query.as_str(),
            _ => DEFAULT_QUERY,
        };

        let url = Self::search_url(query, options.count)?;
        let body = get_ok(self.fetcher.as_ref(), self.name(), &url, &[]).await?;
        let document = parse_xml(&body)?;

        let entries = ensure_array(document.get("feed").and_then(|f| f.get("entry")));
        let items: Vec<FeedItem> = entries
            .into_iter()
            .filter_map(|entry| self.to_item(entry))
            .take(options.count)
            .collect();

        tracing::info!("[{}] fetched {} items for {}", self.name(), items.len(), query);
        Ok(items)
    }
}
