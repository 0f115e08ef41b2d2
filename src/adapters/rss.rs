use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::{Adapter, FetchOptions, ProviderOptions};
use crate::app::{ConfluenceError, Result};
use crate::domain::{FeedItem, SourceType, TimeRange};
use crate::fetcher::{get_ok, Fetcher};
use crate::normalizer::{
    clean_text, ensure_array, extract_link, extract_text, parse_timestamp, parse_xml,
    summarize_html, XmlElement, XmlNode,
};

const SUMMARY_LEN: usize = 200;

/// Feed dialects told apart by their root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Atom,
    /// RSS 2.0 `rss/channel/item`.
    Rss2,
    /// RSS 1.0, items are siblings of the channel under `rdf:RDF`.
    Rdf,
}

impl Dialect {
    pub fn detect(document: &XmlElement) -> Option<Dialect> {
        if document.get("feed").is_some() {
            Some(Dialect::Atom)
        } else if document.get("rss").is_some() {
            Some(Dialect::Rss2)
        } else if document.get("rdf:RDF").is_some() {
            Some(Dialect::Rdf)
        } else {
            None
        }
    }
}

/// Channel title plus its entries, in document order.
fn feed_entries(document: &XmlElement, dialect: Dialect) -> (String, Vec<&XmlNode>) {
    match dialect {
        Dialect::Atom => {
            let feed = document.get("feed");
            (
                extract_text(feed.and_then(|f| f.get("title"))),
                ensure_array(feed.and_then(|f| f.get("entry"))),
            )
        }
        Dialect::Rss2 => {
            let channel = document.get("rss").and_then(|r| r.get("channel"));
            (
                extract_text(channel.and_then(|c| c.get("title"))),
                ensure_array(channel.and_then(|c| c.get("item"))),
            )
        }
        Dialect::Rdf => {
            let root = document.get("rdf:RDF");
            (
                extract_text(root.and_then(|r| r.get("channel")).and_then(|c| c.get("title"))),
                ensure_array(root.and_then(|r| r.get("item"))),
            )
        }
    }
}

/// One entry, before id assignment and date substitution.
#[derive(Debug)]
struct RawEntry {
    title: String,
    link: String,
    body: String,
    date: String,
    author: Option<String>,
    categories: Vec<String>,
}

fn first_text(entry: &XmlNode, names: &[&str]) -> String {
    names
        .iter()
        .map(|name| extract_text(entry.get(name)))
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default()
}

fn read_entry(entry: &XmlNode, dialect: Dialect) -> RawEntry {
    match dialect {
        Dialect::Atom => RawEntry {
            title: extract_text(entry.get("title")),
            link: extract_link(entry.get("link")),
            body: first_text(entry, &["summary", "content"]),
            date: first_text(entry, &["published", "updated"]),
            author: ensure_array(entry.get("author"))
                .first()
                .map(|a| extract_text(a.get("name"))),
            categories: ensure_array(entry.get("category"))
                .into_iter()
                .filter_map(|c| c.attr("term").map(str::to_string))
                .collect(),
        },
        Dialect::Rss2 | Dialect::Rdf => RawEntry {
            title: extract_text(entry.get("title")),
            link: match extract_link(entry.get("link")) {
                link if link.is_empty() => extract_text(entry.get("guid")).trim().to_string(),
                link => link,
            },
            body: first_text(entry, &["description", "content:encoded"]),
            date: first_text(entry, &["pubDate", "dc:date", "published", "updated"]),
            author: Some(first_text(entry, &["author", "dc:creator"])),
            categories: ensure_array(entry.get("category"))
                .into_iter()
                .map(|c| extract_text(Some(c)))
                .collect(),
        },
    }
}

/// Generic RSS 2.0 / RSS 1.0 / Atom reader for user-supplied feeds.
pub struct RssAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl RssAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Normalize a parsed feed. An entry whose date is missing or unreadable
    /// is stamped with `now`; entries older than `now - time_range` are dropped.
    pub fn items_from_document(
        &self,
        document: &XmlElement,
        feed_url: &str,
        display_name: Option<&str>,
        time_range: Option<TimeRange>,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>> {
        let dialect = Dialect::detect(document)
            .ok_or_else(|| ConfluenceError::Parse(format!("{} is not an RSS or Atom feed", feed_url)))?;
        let (feed_title, entries) = feed_entries(document, dialect);

        let source_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| Some(clean_text(&feed_title, None)).filter(|t| !t.is_empty()));
        let cutoff = time_range.map(|range| now - range.window());

        let mut items = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let raw = read_entry(entry, dialect);
            let title = clean_text(&raw.title, None);
            if title.is_empty() {
                continue;
            }

            let published_at = match parse_timestamp(raw.date.trim()) {
                Some(date) => date,
                None => {
                    tracing::warn!(
                        "[{}] unreadable date {:?} on \"{}\", using now",
                        self.name(),
                        raw.date,
                        title
                    );
                    now
                }
            };
            if cutoff.is_some_and(|cutoff| published_at < cutoff) {
                continue;
            }

            let mut item = FeedItem::new(
                format!("rss-{}-{}", feed_url, index),
                title,
                SourceType::Rss,
                raw.link,
            );
            item.source_name = source_name.clone();
            item.summary = summarize_html(&raw.body, SUMMARY_LEN);
            item.published_at = Some(published_at);
            item.author = raw.author.map(|a| clean_text(&a, None)).filter(|a| !a.is_empty());
            item.tags = raw
                .categories
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            items.push(item);

            if items.len() >= count {
                break;
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Adapter for RssAdapter {
    fn name(&self) -> &str {
        SourceType::Rss.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let ProviderOptions::Rss {
            url,
            display_name,
            time_range,
        } = &options.provider
        else {
            return Err(ConfluenceError::Config("RSS source has no feed URL".into()));
        };
        if url.trim().is_empty() {
            return Err(ConfluenceError::Config("RSS source has no feed URL".into()));
        }

        let body = get_ok(self.fetcher.as_ref(), self.name(), url, &[]).await?;
        let document = parse_xml(&body)?;
        let items = self.items_from_document(
            &document,
            url,
            display_name.as_deref(),
            *time_range,
            options.count,
            Utc::now(),
        )?;

        tracing::info!("[{}] fetched {} items from {}", self.name(), items.len(), url);
        Ok(items)
    }
}
