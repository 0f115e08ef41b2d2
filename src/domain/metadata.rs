use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

/// Written once per completed aggregate refresh; drives the freshness policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMetadata {
    /// Epoch milliseconds of the last completed refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<i64>,
    /// Local calendar date of the last refresh, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_date: Option<String>,
}

impl DataMetadata {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            last_update_time: Some(now.timestamp_millis()),
            last_update_date: Some(local_date(now)),
        }
    }
}

pub fn local_date(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// One adapter invocation's output, as cached under `cache_<key>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub items: Vec<FeedItem>,
    /// Epoch milliseconds when the items were fetched.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(items: Vec<FeedItem>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            items,
            timestamp: fetched_at.timestamp_millis(),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.timestamp_millis() - self.timestamp < ttl.num_milliseconds()
    }
}

/// Per-call refresh switches, passed by value through the refresh chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub force_bypass_cache: bool,
}

impl RefreshOptions {
    pub fn forced() -> Self {
        Self {
            force_bypass_cache: true,
        }
    }
}
