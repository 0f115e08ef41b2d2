//! When to refresh: a pure decision over the last refresh's metadata.

use chrono::{DateTime, Duration, Local};

use crate::domain::{local_date, DataMetadata};

/// Data at most this old (minutes) is served as-is.
pub const IMMEDIATE_MAX_AGE_MINUTES: i64 = 30;
/// Data older than this (hours) is refreshed before it is served.
pub const SILENT_MAX_AGE_HOURS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Serve stored data; no refresh.
    Immediate,
    /// Serve stored data and refresh in the background.
    Silent,
    /// Refresh now, bypassing the per-source cache.
    Force,
}

impl RefreshStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshStrategy::Immediate => "immediate",
            RefreshStrategy::Silent => "silent",
            RefreshStrategy::Force => "force",
        }
    }
}

impl std::fmt::Display for RefreshStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crossed calendar day always forces, whatever the age.
pub fn decide(metadata: Option<&DataMetadata>, now: DateTime<Local>) -> RefreshStrategy {
    let Some(metadata) = metadata else {
        return RefreshStrategy::Force;
    };
    let Some(last_update) = metadata.last_update_time else {
        return RefreshStrategy::Force;
    };

    if metadata.last_update_date.as_deref() != Some(local_date(now).as_str()) {
        return RefreshStrategy::Force;
    }

    let age = Duration::milliseconds(now.timestamp_millis() - last_update);
    if age > Duration::hours(SILENT_MAX_AGE_HOURS) {
        RefreshStrategy::Force
    } else if age > Duration::minutes(IMMEDIATE_MAX_AGE_MINUTES) {
        RefreshStrategy::Silent
    } else {
        RefreshStrategy::Immediate
    }
}
