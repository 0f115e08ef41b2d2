pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::app::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// Well-known keys
pub const CONFIG_KEY: &str = "config";
pub const FEED_ITEMS_KEY: &str = "feedItems";
pub const LAST_UPDATE_TIME_KEY: &str = "lastUpdateTime";
pub const DATA_METADATA_KEY: &str = "dataMetadata";
pub const CACHE_PREFIX: &str = "cache_";
pub const AI_SUMMARY_PREFIX: &str = "ai_summary_";
pub const AI_TAGS_PREFIX: &str = "ai_tags_";

/// Key-value persistence. Values are JSON documents.
pub trait KvStore: Send + Sync {
    /// Present keys only; absent keys are simply missing from the map.
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Write every entry, all or nothing.
    fn set(&self, entries: HashMap<String, Value>) -> Result<()>;

    fn remove(&self, keys: &[&str]) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Every stored key, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Read one key as `T`. A value that no longer deserializes is an error.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(&[key])?.remove(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn save<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let mut entries = HashMap::with_capacity(1);
    entries.insert(key.to_string(), serde_json::to_value(value)?);
    store.set(entries)
}
