use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{ConfluenceError, Result};

/// A syndication entry flattened out of feed-rs's model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyndicationEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    /// Raw HTML summary or content body, whichever is present.
    pub body: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

/// Parse any feed dialect feed-rs understands into flat entries.
pub fn parse_syndication(body: &[u8]) -> Result<Vec<SyndicationEntry>> {
    let feed = parser::parse(body).map_err(|e| ConfluenceError::Parse(e.to_string()))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
            let id = if entry.id.is_empty() {
                link.clone()
            } else {
                entry.id
            };

            SyndicationEntry {
                id,
                title: entry
                    .title
                    .map(|t| decode_html_entities(&t.content).to_string())
                    .unwrap_or_default(),
                link,
                body: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body)),
                author: entry.authors.first().map(|a| a.name.clone()),
                published_at: entry.published.or(entry.updated),
                categories: entry.categories.into_iter().map(|c| c.term).collect(),
            }
        })
        .collect();

    Ok(entries)
}
