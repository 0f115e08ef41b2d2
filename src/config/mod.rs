//! Configuration management for Confluence.
//!
//! Configuration is read from `~/.config/confluence/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! A `config` blob in the key-value store (written by import) takes
//! precedence over the file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregator::{DEFAULT_CACHE_TTL_MINUTES, DEFAULT_MAX_ITEMS};
use crate::domain::SourceConfig;

fn default_refresh_hour() -> u32 {
    8
}

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cap on the merged feed.
    #[serde(alias = "maxItems")]
    pub max_items: usize,
    /// Local hour of the daily scheduled refresh.
    #[serde(alias = "refreshHour")]
    pub refresh_hour: u32,
    #[serde(alias = "cacheTtlMinutes")]
    pub cache_ttl_minutes: i64,
    /// Database location; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            refresh_hour: default_refresh_hour(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            database: None,
            sources: SourceConfig::defaults(),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/confluence/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("confluence").join("config.toml"))
    }

    /// Reject configurations the aggregator cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "refresh_hour must be 0-23, got {}",
                self.refresh_hour
            )));
        }
        if self.cache_ttl_minutes < 0 {
            return Err(ConfigError::Invalid("cache_ttl_minutes must not be negative".into()));
        }

        let mut ids = HashSet::new();
        for source in &self.sources {
            if !source.id.is_empty() && !ids.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source id: {}",
                    source.id
                )));
            }
            let missing_url = source.url.as_deref().map_or(true, |u| u.trim().is_empty());
            if source.source_type.needs_url() && missing_url {
                return Err(ConfigError::Invalid(format!(
                    "source {} ({}) needs a url",
                    source.id, source.source_type
                )));
            }
        }
        Ok(())
    }

    /// Look up a source by id.
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    pub fn default_config_content() -> String {
        r##"# Confluence configuration

# Maximum number of items kept in the merged feed
max_items = 100

# Local hour (0-23) of the daily forced refresh run by `confluence daemon`
refresh_hour = 8

# How long a source's cached items are reused before refetching
cache_ttl_minutes = 30

# Database location (defaults to the platform data directory)
# database = "/path/to/confluence.db"

# Sources. `type` is one of: HuggingFace, HackerNews, ArXiv, GitHub,
# ProductHunt, Reddit, DevTo, RSS, Custom.
#
# Optional keys:
#   count      = 10          items requested per refresh
#   enabled    = true
#   is_pinned  = false       pinned sources sort ahead of everything else
#   min_score  = 100         HackerNews only
#   query      = "..."       ArXiv search query, Reddit subreddit, GitHub language
#   url        = "..."       required for RSS and Custom
#   name       = "..."       display name for RSS and Custom
#   time_range = "7d"        RSS and Custom: 1d, 3d, 7d or 30d

[[sources]]
id = "hackernews"
type = "HackerNews"
min_score = 100

[[sources]]
id = "github"
type = "GitHub"

[[sources]]
id = "huggingface"
type = "HuggingFace"

[[sources]]
id = "arxiv"
type = "ArXiv"
query = "cat:cs.AI"

[[sources]]
id = "devto"
type = "DevTo"

[[sources]]
id = "reddit"
type = "Reddit"
query = "programming"
enabled = false

[[sources]]
id = "producthunt"
type = "ProductHunt"
enabled = false

# [[sources]]
# id = "rust-blog"
# type = "RSS"
# name = "Rust Blog"
# url = "https://blog.rust-lang.org/feed.xml"
# time_range = "30d"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
