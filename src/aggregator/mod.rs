//! Turns configured sources into one merged, sorted feed.
//!
//! Every enabled source is fetched concurrently through the registry.
//! Each source has its own cache entry (`cache_<id>`), consulted before
//! the adapter unless the call forces a bypass. A failing source falls
//! back to whatever it last cached, so one bad provider never empties the
//! aggregate.

pub mod cache;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use futures::future::join_all;
use serde_json::Value;

use crate::adapters::{FetchOptions, SourceRegistry};
use crate::app::Result;
use crate::domain::{CacheEntry, DataMetadata, FeedItem, RefreshOptions, SourceConfig};
use crate::store::{load, KvStore, DATA_METADATA_KEY, FEED_ITEMS_KEY, LAST_UPDATE_TIME_KEY};

pub use cache::SourceCache;

pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 30;
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// What a completed refresh persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub items: Vec<FeedItem>,
    pub metadata: DataMetadata,
}

pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn KvStore>,
    cache: SourceCache,
    cache_ttl: Duration,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>, store: Arc<dyn KvStore>) -> Self {
        Self {
            registry,
            cache: SourceCache::new(store.clone()),
            store,
            cache_ttl: Duration::minutes(DEFAULT_CACHE_TTL_MINUTES),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// One source's items: fresh cache, else the adapter, else stale cache.
    pub async fn fetch_source(&self, source: &SourceConfig, options: RefreshOptions) -> Vec<FeedItem> {
        let key = source.cache_key();
        let cached = self.cache.read(&key);

        if !options.force_bypass_cache {
            if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(Utc::now(), self.cache_ttl)) {
                tracing::debug!("[{}] cache hit ({} items)", key, entry.items.len());
                return entry.items.clone();
            }
        }

        let adapter_name = source.source_type.adapter_name();
        let fetch_options = FetchOptions::for_source(source);
        match self.registry.try_fetch_from(adapter_name, &fetch_options).await {
            Ok(items) => {
                self.cache.write(&key, &CacheEntry::new(items.clone(), Utc::now()));
                items
            }
            Err(e) => {
                let fallback = cached.map(|entry| entry.items).unwrap_or_default();
                tracing::warn!(
                    "[{}] fetch failed, serving {} cached items: {}",
                    key,
                    fallback.len(),
                    e
                );
                fallback
            }
        }
    }

    /// Fetch every enabled source and merge the results.
    pub async fn aggregate(&self, sources: &[SourceConfig], options: RefreshOptions) -> Vec<FeedItem> {
        let enabled: Vec<&SourceConfig> = sources.iter().filter(|s| s.enabled).collect();
        let results = join_all(enabled.iter().map(|source| self.fetch_source(source, options))).await;

        let contributions = enabled
            .iter()
            .zip(results)
            .map(|(source, items)| (source.is_pinned, items));
        merge(contributions)
    }

    /// Aggregate, cap at `max_items`, persist the feed and stamp metadata.
    pub async fn refresh(
        &self,
        sources: &[SourceConfig],
        max_items: usize,
        options: RefreshOptions,
    ) -> Result<RefreshReport> {
        let mut items = self.aggregate(sources, options).await;
        items.truncate(max_items);

        let now = Local::now();
        let metadata = DataMetadata::at(now);

        let mut entries = HashMap::with_capacity(3);
        entries.insert(FEED_ITEMS_KEY.to_string(), serde_json::to_value(&items)?);
        entries.insert(
            LAST_UPDATE_TIME_KEY.to_string(),
            Value::from(now.timestamp_millis()),
        );
        entries.insert(DATA_METADATA_KEY.to_string(), serde_json::to_value(&metadata)?);
        self.store.set(entries)?;

        tracing::info!(
            "refresh complete: {} items from {} sources (forced: {})",
            items.len(),
            sources.iter().filter(|s| s.enabled).count(),
            options.force_bypass_cache
        );
        Ok(RefreshReport { items, metadata })
    }

    /// The feed as last persisted.
    pub fn stored_items(&self) -> Result<Vec<FeedItem>> {
        Ok(load(self.store.as_ref(), FEED_ITEMS_KEY)?.unwrap_or_default())
    }

    pub fn stored_metadata(&self) -> Result<Option<DataMetadata>> {
        load(self.store.as_ref(), DATA_METADATA_KEY)
    }
}

/// Concatenate per-source contributions, stamp pinning, sort pinned-first
/// then newest-first, and drop repeated ids keeping the first.
pub fn merge(contributions: impl IntoIterator<Item = (bool, Vec<FeedItem>)>) -> Vec<FeedItem> {
    let mut merged: Vec<FeedItem> = contributions
        .into_iter()
        .flat_map(|(pinned, items)| {
            items.into_iter().map(move |mut item| {
                item.is_pinned = pinned;
                item
            })
        })
        .collect();

    merged.sort_by(FeedItem::feed_order);

    let mut seen = HashSet::with_capacity(merged.len());
    merged.retain(|item| seen.insert(item.id.clone()));
    merged
}

/// Time elapsed since the recorded refresh.
pub fn age_of(metadata: &DataMetadata, now: DateTime<Utc>) -> Option<Duration> {
    metadata
        .last_update_time
        .map(|t| Duration::milliseconds(now.timestamp_millis() - t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Adapter;
    use crate::app::ConfluenceError;
    use crate::domain::SourceType;
    use crate::store::{save, MemoryStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn item(id: &str, source: SourceType, published: Option<i64>) -> FeedItem {
        let mut item = FeedItem::new(id, id, source, format!("https://example.com/{}", id));
        item.published_at = published.map(|s| Utc.timestamp_opt(s, 0).unwrap());
        item
    }

    /// Serves a fixed list, counting calls; can be switched to fail.
    struct Scripted {
        name: &'static str,
        items: Vec<FeedItem>,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl Scripted {
        fn new(name: &'static str, items: Vec<FeedItem>) -> Arc<Self> {
            Arc::new(Self {
                name,
                items,
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Adapter for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ConfluenceError::Other("upstream down".into()));
            }
            Ok(self.items.iter().take(options.count).cloned().collect())
        }
    }

    fn aggregator(adapters: Vec<Arc<Scripted>>) -> (Aggregator, Arc<MemoryStore>) {
        let mut registry = SourceRegistry::new();
        for adapter in adapters {
            registry.register(adapter).unwrap();
        }
        let store = Arc::new(MemoryStore::new());
        (Aggregator::new(Arc::new(registry), store.clone()), store)
    }

    #[test]
    fn test_merge_pinned_first_then_newest() {
        let older_pinned = item("pinned-old", SourceType::Rss, Some(1_000));
        let newer = item("plain-new", SourceType::HackerNews, Some(2_000));
        let undated = item("plain-undated", SourceType::GitHub, None);

        let merged = merge(vec![
            (false, vec![undated, newer]),
            (true, vec![older_pinned]),
        ]);
        let ids: Vec<_> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["pinned-old", "plain-new", "plain-undated"]);
        assert!(merged[0].is_pinned);
        assert!(!merged[1].is_pinned);
    }

    #[test]
    fn test_merge_dedupes_keeping_first() {
        let pinned_copy = item("dup", SourceType::Rss, Some(10));
        let plain_copy = item("dup", SourceType::Custom, Some(20));
        let merged = merge(vec![(false, vec![plain_copy]), (true, vec![pinned_copy])]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_pinned);
    }

    #[tokio::test]
    async fn test_cache_hit_and_force_bypass() {
        let hn = Scripted::new(
            "HackerNews",
            vec![item("hackernews-1", SourceType::HackerNews, Some(1))],
        );
        let (aggregator, store) = aggregator(vec![hn.clone()]);
        let source = SourceConfig::new("hn", SourceType::HackerNews);

        assert_eq!(aggregator.fetch_source(&source, RefreshOptions::default()).await.len(), 1);
        assert_eq!(aggregator.fetch_source(&source, RefreshOptions::default()).await.len(), 1);
        assert_eq!(hn.calls.load(Ordering::SeqCst), 1);
        assert!(store.get(&["cache_hn"]).unwrap().contains_key("cache_hn"));

        aggregator.fetch_source(&source, RefreshOptions::forced()).await;
        assert_eq!(hn.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_cache_is_refetched() {
        let hn = Scripted::new("HackerNews", vec![]);
        let (aggregator, store) = aggregator(vec![hn.clone()]);
        let source = SourceConfig::new("hn", SourceType::HackerNews);

        let stale = CacheEntry::new(
            vec![item("hackernews-old", SourceType::HackerNews, Some(1))],
            Utc::now() - Duration::minutes(45),
        );
        save(store.as_ref(), "cache_hn", &stale).unwrap();

        let items = aggregator.fetch_source(&source, RefreshOptions::default()).await;
        assert!(items.is_empty());
        assert_eq!(hn.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_stale_cache() {
        let hn = Scripted::new("HackerNews", vec![]);
        hn.failing.store(true, Ordering::SeqCst);
        let (aggregator, store) = aggregator(vec![hn.clone()]);
        let source = SourceConfig::new("hn", SourceType::HackerNews);

        assert!(aggregator
            .fetch_source(&source, RefreshOptions::forced())
            .await
            .is_empty());

        let stale = CacheEntry::new(
            vec![item("hackernews-old", SourceType::HackerNews, Some(1))],
            Utc::now() - Duration::hours(3),
        );
        save(store.as_ref(), "cache_hn", &stale).unwrap();

        let items = aggregator.fetch_source(&source, RefreshOptions::forced()).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "hackernews-old");
    }

    #[tokio::test]
    async fn test_refresh_skips_disabled_and_persists() {
        let hn = Scripted::new(
            "HackerNews",
            vec![
                item("hackernews-1", SourceType::HackerNews, Some(100)),
                item("hackernews-2", SourceType::HackerNews, Some(300)),
            ],
        );
        let gh = Scripted::new("GitHub", vec![item("github-a/b", SourceType::GitHub, None)]);
        let (aggregator, _store) = aggregator(vec![hn.clone(), gh.clone()]);

        let mut pinned_gh = SourceConfig::new("gh", SourceType::GitHub);
        pinned_gh.is_pinned = true;
        let mut disabled = SourceConfig::new("hn-off", SourceType::HackerNews);
        disabled.enabled = false;
        let sources = vec![SourceConfig::new("hn", SourceType::HackerNews), pinned_gh, disabled];

        let report = aggregator
            .refresh(&sources, 2, RefreshOptions::forced())
            .await
            .unwrap();
        let ids: Vec<_> = report.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["github-a/b", "hackernews-2"]);
        assert_eq!(hn.calls.load(Ordering::SeqCst), 1);

        assert_eq!(aggregator.stored_items().unwrap(), report.items);
        let metadata = aggregator.stored_metadata().unwrap().unwrap();
        assert_eq!(metadata, report.metadata);
        assert!(age_of(&metadata, Utc::now()).unwrap() < Duration::minutes(1));
    }
}
