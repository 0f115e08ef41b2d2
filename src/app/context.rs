use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local};
use tokio::task::JoinHandle;

use crate::adapters::SourceRegistry;
use crate::aggregator::{Aggregator, RefreshReport};
use crate::app::error::{ConfluenceError, Result};
use crate::config::Config;
use crate::domain::{DataMetadata, FeedItem, RefreshOptions};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::freshness::{self, RefreshStrategy};
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{load, KvStore, CONFIG_KEY};

/// What the feed surface should show right now.
pub struct FeedLoad {
    pub strategy: RefreshStrategy,
    pub items: Vec<FeedItem>,
    /// The background refresh started for [`RefreshStrategy::Silent`].
    pub background: Option<JoinHandle<Result<RefreshReport>>>,
}

pub struct AppContext {
    pub store: Arc<dyn KvStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub aggregator: Arc<Aggregator>,
    file_config: Config,
}

impl AppContext {
    /// Open the on-disk store named by `config.database`, or the default
    /// one under the platform data directory.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.database.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store: Arc<dyn KvStore> = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
        Self::with_parts(config, store, fetcher)
    }

    /// Ephemeral state, real network.
    pub fn in_memory(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
        Self::with_parts(config, Arc::new(MemoryStore::new()), fetcher)
    }

    pub fn with_parts(config: Config, store: Arc<dyn KvStore>, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let registry = Arc::new(SourceRegistry::with_default_adapters(fetcher.clone())?);
        let ttl_minutes = effective_config(store.as_ref(), &config).cache_ttl_minutes;
        let aggregator = Aggregator::new(registry, store.clone())
            .with_cache_ttl(Duration::minutes(ttl_minutes));

        Ok(Self {
            store,
            fetcher,
            aggregator: Arc::new(aggregator),
            file_config: config,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ConfluenceError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("confluence");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("confluence.db"))
    }

    /// The stored `config` blob when there is one, otherwise the file.
    pub fn active_config(&self) -> Config {
        effective_config(self.store.as_ref(), &self.file_config)
    }

    pub async fn refresh(&self, options: RefreshOptions) -> Result<RefreshReport> {
        let config = self.active_config();
        self.aggregator
            .refresh(&config.sources, config.max_items, options)
            .await
    }

    pub fn stored_items(&self) -> Result<Vec<FeedItem>> {
        self.aggregator.stored_items()
    }

    pub fn stored_metadata(&self) -> Result<Option<DataMetadata>> {
        self.aggregator.stored_metadata()
    }

    /// Serve the feed according to the freshness policy.
    pub async fn load_feed(&self) -> Result<FeedLoad> {
        let metadata = self.stored_metadata()?;
        let strategy = freshness::decide(metadata.as_ref(), Local::now());
        tracing::debug!("feed load strategy: {}", strategy);

        match strategy {
            RefreshStrategy::Immediate => Ok(FeedLoad {
                strategy,
                items: self.stored_items()?,
                background: None,
            }),
            RefreshStrategy::Silent => {
                let items = self.stored_items()?;
                let aggregator = self.aggregator.clone();
                let config = self.active_config();
                let background = tokio::spawn(async move {
                    aggregator
                        .refresh(&config.sources, config.max_items, RefreshOptions::default())
                        .await
                });
                Ok(FeedLoad {
                    strategy,
                    items,
                    background: Some(background),
                })
            }
            RefreshStrategy::Force => {
                let report = self.refresh(RefreshOptions::forced()).await?;
                Ok(FeedLoad {
                    strategy,
                    items: report.items,
                    background: None,
                })
            }
        }
    }
}

fn effective_config(store: &dyn KvStore, file_config: &Config) -> Config {
    match load::<Config>(store, CONFIG_KEY) {
        Ok(Some(config)) => config,
        Ok(None) => file_config.clone(),
        Err(e) => {
            tracing::warn!("ignoring stored config: {}", e);
            file_config.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HuggingFaceAdapter;
    use crate::domain::{SourceConfig, SourceType};
    use crate::fetcher::stub::StubFetcher;
    use crate::store::{save, DATA_METADATA_KEY, FEED_ITEMS_KEY};

    const PAPERS: &str = r#"[
        {"paper": {"id": "2401.00001", "title": "Paper One", "summary": "First",
                   "publishedAt": "2024-01-02T00:00:00.000Z", "upvotes": 12,
                   "authors": [{"name": "Ada"}]}}
    ]"#;

    fn only_huggingface() -> Config {
        Config {
            sources: vec![SourceConfig::new("huggingface", SourceType::HuggingFace)],
            ..Config::default()
        }
    }

    fn context(store: Arc<dyn KvStore>) -> AppContext {
        let fetcher = StubFetcher::new().with_body(HuggingFaceAdapter::top_url(10), PAPERS);
        AppContext::with_parts(only_huggingface(), store, Arc::new(fetcher)).unwrap()
    }

    fn stored_item(id: &str) -> FeedItem {
        FeedItem::new(id, "Stored", SourceType::HackerNews, "https://stored")
    }

    #[test]
    fn test_stored_config_overrides_file() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let ctx = context(store.clone());
        assert_eq!(ctx.active_config(), only_huggingface());

        let imported = Config {
            max_items: 3,
            ..Config::default()
        };
        save(store.as_ref(), CONFIG_KEY, &imported).unwrap();
        assert_eq!(ctx.active_config().max_items, 3);
    }

    #[tokio::test]
    async fn test_load_feed_without_metadata_forces() {
        let ctx = context(Arc::new(MemoryStore::new()));
        let load = ctx.load_feed().await.unwrap();
        assert_eq!(load.strategy, RefreshStrategy::Force);
        assert!(load.background.is_none());
        assert_eq!(load.items.len(), 1);
        assert_eq!(load.items[0].title, "Paper One");
        assert!(ctx.stored_metadata().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_load_feed_fresh_serves_stored() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        save(store.as_ref(), FEED_ITEMS_KEY, &vec![stored_item("hackernews-1")]).unwrap();
        save(store.as_ref(), DATA_METADATA_KEY, &DataMetadata::at(Local::now())).unwrap();

        let ctx = context(store);
        let load = ctx.load_feed().await.unwrap();
        assert_eq!(load.strategy, RefreshStrategy::Immediate);
        assert_eq!(load.items, vec![stored_item("hackernews-1")]);
    }

    #[tokio::test]
    async fn test_load_feed_silent_refreshes_in_background() {
        let now = Local::now();
        // Keep the stored refresh on today's date so the day rule does not force.
        let Some(earlier) = Some(now - Duration::hours(1)).filter(|t| t.date_naive() == now.date_naive())
        else {
            return;
        };

        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        save(store.as_ref(), FEED_ITEMS_KEY, &vec![stored_item("hackernews-1")]).unwrap();
        save(store.as_ref(), DATA_METADATA_KEY, &DataMetadata::at(earlier)).unwrap();

        let ctx = context(store);
        let load = ctx.load_feed().await.unwrap();
        assert_eq!(load.strategy, RefreshStrategy::Silent);
        assert_eq!(load.items, vec![stored_item("hackernews-1")]);

        let report = load.background.unwrap().await.unwrap().unwrap();
        assert_eq!(report.items[0].title, "Paper One");
        assert_eq!(ctx.stored_items().unwrap(), report.items);
    }
}
