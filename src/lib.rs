//! # Confluence
//!
//! A multi-source news aggregator: REST APIs, RSS/Atom feeds and scraped
//! pages merged into one freshness-aware feed.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Adapters → Normalizer → Aggregator → Store
//!                                       ↑
//!                              Freshness policy
//! ```
//!
//! - [`adapters`]: one adapter per provider, looked up through a registry
//! - [`normalizer`]: text, time and XML helpers every adapter shares
//! - [`aggregator`]: concurrent fan-out, per-source caching, merge and sort
//! - [`freshness`]: decides whether stored data is served or refreshed
//! - [`store`]: key-value persistence (SQLite or in-memory)
//!
//! ## Quick Start
//!
//! ```bash
//! # Refresh every enabled source
//! confluence refresh
//!
//! # Print the merged feed
//! confluence list --limit 10
//!
//! # Refresh every morning at 07:00
//! confluence daemon --hour 7
//! ```

/// Provider adapters and the registry that dispatches to them.
///
/// - [`Adapter`](adapters::Adapter): async trait every provider implements
/// - [`SourceRegistry`](adapters::SourceRegistry): name → adapter lookup with panic isolation
pub mod adapters;

/// Fan-out, caching and merging of configured sources.
pub mod aggregator;

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher, registry and aggregator.
pub mod app;

/// Command-line interface using clap.
///
/// - `refresh [--force]` - Refresh every enabled source
/// - `status` - Show the last refresh and scheduler state
/// - `list [--limit]` - Print the merged feed
/// - `sources` - List configured sources
/// - `export --format json|csv` - Export the feed
/// - `import <path>` - Import a JSON export
/// - `daemon` - Run the daily scheduler
/// - `clear` - Delete all stored data
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/confluence/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`FeedItem`](domain::FeedItem): one normalized entry
/// - [`SourceConfig`](domain::SourceConfig): one configured provider instance
/// - [`DataMetadata`](domain::DataMetadata): when the feed was last refreshed
pub mod domain;

/// AI enrichment contract and its store-backed cache.
pub mod enrich;

/// JSON and CSV export, JSON import.
pub mod export;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for GET requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`StubFetcher`](fetcher::stub::StubFetcher): canned responses for tests
pub mod fetcher;

pub mod freshness;

/// Text, time, XML and HTML normalization helpers.
pub mod normalizer;

/// Daily refresh scheduler.
pub mod scheduler;

/// Key-value persistence.
///
/// - [`KvStore`](store::KvStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): in-process implementation
pub mod store;
