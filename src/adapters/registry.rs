use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;

use crate::adapters::{default_adapters, Adapter, FetchOptions};
use crate::app::{ConfluenceError, Result};
use crate::domain::FeedItem;
use crate::fetcher::Fetcher;

/// Name-keyed adapter table. Built once at startup, then shared read-only.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in adapter.
    pub fn with_default_adapters(fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let mut registry = Self::new();
        for adapter in default_adapters(fetcher) {
            registry.register(adapter)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let name = adapter.name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(ConfluenceError::DuplicateAdapter(name));
        }
        tracing::debug!("registered adapter {}", name);
        self.adapters.insert(name, adapter);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.remove(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fetch from one adapter, reporting failure. A panicking adapter is
    /// reported as an error rather than unwinding into the caller.
    pub async fn try_fetch_from(&self, name: &str, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let adapter = self
            .get(name)
            .ok_or_else(|| ConfluenceError::UnknownSource(name.to_string()))?;

        match AssertUnwindSafe(adapter.fetch_items(options))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ConfluenceError::Other(format!("adapter {} panicked: {}", name, message)))
            }
        }
    }

    /// Fetch from one adapter; unknown names and failures become an empty list.
    pub async fn fetch_from(&self, name: &str, options: &FetchOptions) -> Vec<FeedItem> {
        match self.try_fetch_from(name, options).await {
            Ok(items) => items,
            Err(ConfluenceError::UnknownSource(name)) => {
                tracing::warn!("no adapter registered for {}", name);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("[{}] fetch failed: {}", name, e);
                Vec::new()
            }
        }
    }

    /// Fetch from several adapters concurrently. Results are concatenated
    /// in the order the names were given.
    pub async fn fetch_from_many(&self, names: &[&str], options: &FetchOptions) -> Vec<FeedItem> {
        let results = join_all(names.iter().map(|name| self.fetch_from(name, options))).await;
        results.into_iter().flatten().collect()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("adapters", &self.list_names())
            .finish()
    }
}
