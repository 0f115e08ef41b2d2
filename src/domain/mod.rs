pub mod item;
pub mod metadata;
pub mod source;

pub use item::FeedItem;
pub use metadata::{local_date, CacheEntry, DataMetadata, RefreshOptions};
pub use source::{SourceConfig, SourceType, TimeRange};
