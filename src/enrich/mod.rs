//! AI enrichment contract: summaries and tag suggestions for feed items.
//!
//! The service itself lives outside this crate. What lives here is the
//! trait it is consumed through, tolerant parsing of its tag replies, the
//! retry policy for its network calls, and a store-backed memo so an item
//! is only ever enriched once.

pub mod cached;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

pub use cached::CachedEnricher;

pub const MIN_TAGS: usize = 3;
pub const MAX_TAGS: usize = 5;
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    /// No endpoint or credentials; route the user to settings.
    #[error("enrichment service is not configured")]
    NotConfigured,

    #[error("enrichment service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("enrichment failed: {0}")]
    Failed(String),
}

impl EnrichError {
    /// Rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrichError::Http { status, .. } if *status == 429 || *status >= 500)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "AI")]
    Ai,
    Programming,
    Web,
    Mobile,
    DevOps,
    Security,
    Data,
    Design,
    Product,
    Science,
    Hardware,
    Business,
    Other,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Ai,
        Category::Programming,
        Category::Web,
        Category::Mobile,
        Category::DevOps,
        Category::Security,
        Category::Data,
        Category::Design,
        Category::Product,
        Category::Science,
        Category::Hardware,
        Category::Business,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ai => "AI",
            Category::Programming => "Programming",
            Category::Web => "Web",
            Category::Mobile => "Mobile",
            Category::DevOps => "DevOps",
            Category::Security => "Security",
            Category::Data => "Data",
            Category::Design => "Design",
            Category::Product => "Product",
            Category::Science => "Science",
            Category::Hardware => "Hardware",
            Category::Business => "Business",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive; anything unrecognized is `Other`.
    pub fn from_label(label: &str) -> Category {
        let label = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub tags: Vec<String>,
    pub category: Category,
}

/// Receives partial summary text as it streams in.
pub type DeltaSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Short natural-language summary. Partial text may be pushed to
    /// `on_delta` before the full summary is returned.
    async fn summarize(&self, item: &FeedItem, on_delta: DeltaSink<'_>) -> Result<String, EnrichError>;

    async fn suggest_tags(&self, text: &str) -> Result<TagSuggestion, EnrichError>;
}

/// Parse a tag reply. The JSON object may be wrapped in prose or a code
/// fence; tags are trimmed, de-duplicated and capped.
pub fn parse_tag_response(raw: &str) -> Result<TagSuggestion, EnrichError> {
    #[derive(Deserialize)]
    struct Reply {
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        category: Option<String>,
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(EnrichError::Failed("no JSON object in tag response".into())),
    };

    let reply: Reply = serde_json::from_str(json)
        .map_err(|e| EnrichError::Failed(format!("unreadable tag response: {}", e)))?;

    let mut tags: Vec<String> = Vec::with_capacity(MAX_TAGS);
    for tag in reply.tags {
        let tag = tag.trim().trim_start_matches('#').trim().to_string();
        if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    if tags.len() < MIN_TAGS {
        return Err(EnrichError::Failed(format!(
            "expected at least {} tags, got {}",
            MIN_TAGS,
            tags.len()
        )));
    }

    Ok(TagSuggestion {
        tags,
        category: reply
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Other),
    })
}

/// Exponential backoff schedule for enrichment calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.initial_interval * 32,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `operation`, retrying retryable failures up to `policy.max_retries` times.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, EnrichError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnrichError>>,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = backoff.next_backoff().unwrap_or(policy.initial_interval);
                tracing::warn!(
                    "enrichment attempt {} failed, retrying in {:?}: {}",
                    attempt,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_retries: MAX_RETRIES,
            initial_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_parse_tag_response_in_code_fence() {
        let raw = "Here you go:\n```json\n{\"tags\": [\"Rust\", \" async \", \"#tokio\", \"rust\", \"io\", \"net\", \"extra\"], \"category\": \"programming\"}\n```";
        let suggestion = parse_tag_response(raw).unwrap();
        assert_eq!(suggestion.tags, vec!["Rust", "async", "tokio", "io", "net"]);
        assert_eq!(suggestion.category, Category::Programming);
    }

    #[test]
    fn test_parse_tag_response_unknown_category() {
        let raw = r#"{"tags": ["a", "b", "c"], "category": "Gardening"}"#;
        assert_eq!(parse_tag_response(raw).unwrap().category, Category::Other);

        let ai = r#"{"tags": ["a", "b", "c"], "category": "ai"}"#;
        assert_eq!(parse_tag_response(ai).unwrap().category, Category::Ai);
    }

    #[test]
    fn test_parse_tag_response_rejects_garbage() {
        assert!(parse_tag_response("no json here").is_err());
        assert!(parse_tag_response(r#"{"tags": ["only", "two"]}"#).is_err());
        assert!(parse_tag_response("{not json}").is_err());
    }

    #[test]
    fn test_retryable_statuses() {
        let http = |status| EnrichError::Http {
            status,
            message: String::new(),
        };
        assert!(http(429).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!EnrichError::NotConfigured.is_retryable());
        assert!(!EnrichError::Failed("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_rate_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(quick(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(EnrichError::Http {
                    status: 429,
                    message: "slow down".into(),
                })
            } else {
                Ok("summary")
            }
        })
        .await;
        assert_eq!(result, Ok("summary"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_cap() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(quick(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EnrichError::Http {
                status: 500,
                message: "boom".into(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_not_configured() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(quick(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EnrichError::NotConfigured)
        })
        .await;
        assert_eq!(result, Err(EnrichError::NotConfigured));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
