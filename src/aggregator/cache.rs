use std::sync::Arc;

use crate::domain::CacheEntry;
use crate::store::{load, save, KvStore};

/// Per-source cache over the key-value store. Storage trouble is logged
/// and treated as a miss so it never fails a fetch.
#[derive(Clone)]
pub struct SourceCache {
    store: Arc<dyn KvStore>,
}

impl SourceCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn read(&self, key: &str) -> Option<CacheEntry> {
        match load::<CacheEntry>(self.store.as_ref(), key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub fn write(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = save(self.store.as_ref(), key, entry) {
            tracing::warn!("cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedItem, SourceType};
    use crate::store::MemoryStore;
    use chrono::Utc;

    #[test]
    fn test_round_trip_and_corrupt_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = SourceCache::new(store.clone());
        assert!(cache.read("cache_hn").is_none());

        let item = FeedItem::new("hackernews-1", "One", SourceType::HackerNews, "https://a");
        let entry = CacheEntry::new(vec![item], Utc::now());
        cache.write("cache_hn", &entry);
        assert_eq!(cache.read("cache_hn"), Some(entry));

        save(store.as_ref(), "cache_bad", &"garbage").unwrap();
        assert!(cache.read("cache_bad").is_none());
    }
}
