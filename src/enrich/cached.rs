use std::sync::Arc;

use crate::domain::FeedItem;
use crate::enrich::{with_retry, DeltaSink, EnrichError, Enricher, RetryPolicy, TagSuggestion};
use crate::store::{load, save, KvStore, AI_SUMMARY_PREFIX, AI_TAGS_PREFIX};

pub fn summary_key(item_id: &str) -> String {
    format!("{}{}", AI_SUMMARY_PREFIX, item_id)
}

pub fn tags_key(item_id: &str) -> String {
    format!("{}{}", AI_TAGS_PREFIX, item_id)
}

/// Memoises an [`Enricher`] in the key-value store, one entry per item,
/// and retries its calls with backoff.
pub struct CachedEnricher<E> {
    inner: E,
    store: Arc<dyn KvStore>,
    policy: RetryPolicy,
}

impl<E: Enricher> CachedEnricher<E> {
    pub fn new(inner: E, store: Arc<dyn KvStore>) -> Self {
        Self {
            inner,
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cached summary if present (delivered to `on_delta` in one piece),
    /// otherwise a fresh one that is then stored.
    pub async fn summarize(&self, item: &FeedItem, on_delta: DeltaSink<'_>) -> Result<String, EnrichError> {
        let key = summary_key(&item.id);
        if let Some(summary) = self.read::<String>(&key) {
            on_delta(&summary);
            return Ok(summary);
        }

        let summary = with_retry(self.policy, || self.inner.summarize(item, on_delta)).await?;
        self.write(&key, &summary);
        Ok(summary)
    }

    /// Tags for an item, from its title and summary.
    pub async fn suggest_tags(&self, item: &FeedItem) -> Result<TagSuggestion, EnrichError> {
        let key = tags_key(&item.id);
        if let Some(suggestion) = self.read::<TagSuggestion>(&key) {
            return Ok(suggestion);
        }

        let text = match item.summary.as_deref() {
            Some(summary) => format!("{}\n\n{}", item.title, summary),
            None => item.title.clone(),
        };
        let suggestion = with_retry(self.policy, || self.inner.suggest_tags(&text)).await?;
        self.write(&key, &suggestion);
        Ok(suggestion)
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        load(self.store.as_ref(), key).unwrap_or_else(|e| {
            tracing::warn!("ignoring cached {}: {}", key, e);
            None
        })
    }

    fn write<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = save(self.store.as_ref(), key, value) {
            tracing::warn!("could not cache {}: {}", key, e);
        }
    }
}
