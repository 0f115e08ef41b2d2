//! Export and import of aggregate state.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{ConfluenceError, Result};
use crate::config::Config;
use crate::domain::FeedItem;
use crate::enrich::cached::summary_key;
use crate::store::{KvStore, CONFIG_KEY, FEED_ITEMS_KEY};

pub const EXPORT_VERSION: u32 = 1;

pub const CSV_HEADER: [&str; 8] = [
    "id",
    "title",
    "source",
    "url",
    "summary",
    "publishedAt",
    "tags",
    "aiSummary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// The exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    #[serde(default)]
    pub feed_items: Vec<FeedItem>,
}

impl ExportBundle {
    pub fn new(config: Config, feed_items: Vec<FeedItem>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config,
            feed_items,
        }
    }
}

/// Pretty-printed JSON.
pub fn export_json(config: &Config, items: &[FeedItem]) -> Result<String> {
    let bundle = ExportBundle::new(config.clone(), items.to_vec());
    Ok(serde_json::to_string_pretty(&bundle)?)
}

/// CSV with every field quoted. Tags are joined with `;`; the AI summary
/// column is filled from the summary cache.
pub fn export_csv(items: &[FeedItem], store: &dyn KvStore) -> Result<String> {
    let keys: Vec<String> = items.iter().map(|i| summary_key(&i.id)).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let summaries = store.get(&key_refs)?;

    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().copied());

    for (item, key) in items.iter().zip(&keys) {
        let published = item
            .published_at
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let tags = item.tags.join(";");
        let ai_summary = summaries
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        push_row(
            &mut out,
            [
                item.id.as_str(),
                item.title.as_str(),
                item.display_source(),
                item.url.as_str(),
                item.summary.as_deref().unwrap_or_default(),
                published.as_str(),
                tags.as_str(),
                ai_summary,
            ],
        );
    }
    Ok(out)
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(csv_field).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Quote a field, doubling embedded quotes.
pub fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Parse and validate an export, then apply it in one write. Nothing is
/// written unless the whole document is acceptable.
pub fn import_json(store: &dyn KvStore, json: &str) -> Result<ExportBundle> {
    let bundle: ExportBundle =
        serde_json::from_str(json).map_err(|e| ConfluenceError::Import(e.to_string()))?;

    if bundle.version > EXPORT_VERSION {
        return Err(ConfluenceError::Import(format!(
            "unsupported export version {}",
            bundle.version
        )));
    }
    bundle
        .config
        .validate()
        .map_err(|e| ConfluenceError::Import(e.to_string()))?;

    let mut entries = HashMap::with_capacity(2);
    entries.insert(CONFIG_KEY.to_string(), serde_json::to_value(&bundle.config)?);
    entries.insert(
        FEED_ITEMS_KEY.to_string(),
        serde_json::to_value(&bundle.feed_items)?,
    );
    store.set(entries)?;

    tracing::info!(
        "imported {} sources and {} items",
        bundle.config.sources.len(),
        bundle.feed_items.len()
    );
    Ok(bundle)
}
