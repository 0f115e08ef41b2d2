use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SourceType;

/// The normalized unit of content produced by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub source: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

impl FeedItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: SourceType,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source,
            source_name: None,
            url: url.into(),
            summary: None,
            published_at: None,
            tags: Vec::new(),
            score: None,
            upvotes: None,
            comment_count: None,
            author: None,
            is_pinned: false,
        }
    }

    /// Deterministic id: `lowercase(source_name) + "-" + local_id`.
    pub fn make_id(source_name: &str, local_id: impl std::fmt::Display) -> String {
        format!("{}-{}", source_name.to_lowercase(), local_id)
    }

    /// Name shown next to the item; falls back to the provider tag.
    pub fn display_source(&self) -> &str {
        self.source_name
            .as_deref()
            .unwrap_or_else(|| self.source.as_str())
    }

    /// Publication time in epoch milliseconds, with a missing date as epoch zero.
    pub fn sort_timestamp(&self) -> i64 {
        self.published_at
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    }

    /// Feed ordering: pinned items first, then newest first.
    pub fn feed_order(a: &FeedItem, b: &FeedItem) -> Ordering {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.sort_timestamp().cmp(&a.sort_timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, published: Option<i64>, pinned: bool) -> FeedItem {
        let mut item = FeedItem::new(id, id, SourceType::Rss, "");
        item.published_at = published.map(|s| Utc.timestamp_opt(s, 0).unwrap());
        item.is_pinned = pinned;
        item
    }

    #[test]
    fn test_make_id_lowercases_source() {
        assert_eq!(FeedItem::make_id("HackerNews", 42), "hackernews-42");
        assert_eq!(FeedItem::make_id("DevTo", "abc"), "devto-abc");
    }

    #[test]
    fn test_missing_date_sorts_as_oldest() {
        let mut items = vec![
            item("undated", None, false),
            item("old", Some(1_000), false),
            item("new", Some(2_000), false),
        ];
        items.sort_by(FeedItem::feed_order);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_pinned_beats_recency() {
        let mut items = vec![item("fresh", Some(9_000), false), item("pinned", Some(1), true)];
        items.sort_by(FeedItem::feed_order);
        assert_eq!(items[0].id, "pinned");
    }

    #[test]
    fn test_display_source_prefers_override() {
        let mut item = FeedItem::new("rss-x-0", "t", SourceType::Rss, "");
        assert_eq!(item.display_source(), "RSS");
        item.source_name = Some("Rust Blog".into());
        assert_eq!(item.display_source(), "Rust Blog");
    }

    #[test]
    fn test_serializes_camel_case_and_skips_empty() {
        let mut item = FeedItem::new("devto-1", "Hello", SourceType::DevTo, "https://dev.to/x");
        item.comment_count = Some(3);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["commentCount"], 3);
        assert_eq!(json["isPinned"], false);
        assert!(json.get("tags").is_none());
        assert!(json.get("publishedAt").is_none());
    }
}
