use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Closed set of provider tags. The string form is also the registry name
/// of the adapter serving the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    HuggingFace,
    HackerNews,
    ArXiv,
    GitHub,
    ProductHunt,
    Reddit,
    DevTo,
    #[serde(rename = "RSS")]
    Rss,
    Custom,
}

impl SourceType {
    pub const ALL: [SourceType; 9] = [
        SourceType::HuggingFace,
        SourceType::HackerNews,
        SourceType::ArXiv,
        SourceType::GitHub,
        SourceType::ProductHunt,
        SourceType::Reddit,
        SourceType::DevTo,
        SourceType::Rss,
        SourceType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::HuggingFace => "HuggingFace",
            SourceType::HackerNews => "HackerNews",
            SourceType::ArXiv => "ArXiv",
            SourceType::GitHub => "GitHub",
            SourceType::ProductHunt => "ProductHunt",
            SourceType::Reddit => "Reddit",
            SourceType::DevTo => "DevTo",
            SourceType::Rss => "RSS",
            SourceType::Custom => "Custom",
        }
    }

    /// Name of the registered adapter that serves this provider.
    pub fn adapter_name(&self) -> &'static str {
        match self {
            SourceType::Custom => SourceType::Rss.as_str(),
            other => other.as_str(),
        }
    }

    /// Whether a per-instance feed URL is required.
    pub fn needs_url(&self) -> bool {
        matches!(self, SourceType::Rss | SourceType::Custom)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age window for feed-style sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    pub fn window(&self) -> Duration {
        match self {
            TimeRange::Day => Duration::days(1),
            TimeRange::ThreeDays => Duration::days(3),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
        }
    }
}

fn default_count() -> usize {
    10
}

fn default_enabled() -> bool {
    true
}

/// One configured provider instance. Read-only input to aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default, alias = "min_score", skip_serializing_if = "Option::is_none")]
    pub min_score: Option<u32>,
    /// Search query for ArXiv, subreddit for Reddit, language for GitHub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, alias = "time_range", skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default, alias = "is_pinned")]
    pub is_pinned: bool,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source_type,
            name: None,
            enabled: true,
            url: None,
            count: default_count(),
            min_score: None,
            query: None,
            time_range: None,
            is_pinned: false,
        }
    }

    pub fn rss(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: Some(url.into()),
            ..Self::new(id, SourceType::Rss)
        }
    }

    /// Key of this source's cache entry: `cache_<id>`, or `cache_<type>` without an id.
    pub fn cache_key(&self) -> String {
        if self.id.is_empty() {
            format!("cache_{}", self.source_type.as_str())
        } else {
            format!("cache_{}", self.id)
        }
    }

    /// The built-in sources a fresh install starts with.
    pub fn defaults() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                min_score: Some(100),
                ..Self::new("hackernews", SourceType::HackerNews)
            },
            Self::new("github", SourceType::GitHub),
            Self::new("huggingface", SourceType::HuggingFace),
            SourceConfig {
                query: Some("cat:cs.AI".into()),
                ..Self::new("arxiv", SourceType::ArXiv)
            },
            Self::new("devto", SourceType::DevTo),
            SourceConfig {
                query: Some("programming".into()),
                enabled: false,
                ..Self::new("reddit", SourceType::Reddit)
            },
            SourceConfig {
                enabled: false,
                ..Self::new("producthunt", SourceType::ProductHunt)
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_prefers_id() {
        let source = SourceConfig::new("hn-main", SourceType::HackerNews);
        assert_eq!(source.cache_key(), "cache_hn-main");

        let anonymous = SourceConfig::new("", SourceType::HackerNews);
        assert_eq!(anonymous.cache_key(), "cache_HackerNews");
    }

    #[test]
    fn test_custom_routes_to_rss_adapter() {
        assert_eq!(SourceType::Custom.adapter_name(), "RSS");
        assert_eq!(SourceType::GitHub.adapter_name(), "GitHub");
        assert!(SourceType::Custom.needs_url());
        assert!(!SourceType::ArXiv.needs_url());
    }

    #[test]
    fn test_time_range_serde() {
        let range: TimeRange = serde_json::from_str("\"7d\"").unwrap();
        assert_eq!(range, TimeRange::Week);
        assert_eq!(range.window(), Duration::days(7));
        assert_eq!(serde_json::to_string(&TimeRange::Month).unwrap(), "\"30d\"");
    }

    #[test]
    fn test_source_config_defaults_from_json() {
        let source: SourceConfig =
            serde_json::from_str(r#"{"id":"blog","type":"RSS","url":"https://x.dev/feed"}"#)
                .unwrap();
        assert!(source.enabled);
        assert_eq!(source.count, 10);
        assert!(!source.is_pinned);
        assert_eq!(source.source_type, SourceType::Rss);
    }
}
