use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::app::{ConfluenceError, Result};
use crate::store::KvStore;

/// Process-local store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> ConfluenceError {
    ConfluenceError::Other(format!("memory store lock poisoned: {}", e))
}

impl KvStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, new_entries: HashMap<String, Value>) -> Result<()> {
        self.entries.write().map_err(poisoned)?.extend(new_entries);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().map_err(poisoned)?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
