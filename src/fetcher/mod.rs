pub mod http_fetcher;
pub mod stub;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::app::{ConfluenceError, Result};

pub use http_fetcher::HttpFetcher;
pub use stub::StubFetcher;

/// Raw outcome of a GET; the status is not interpreted here.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: "OK".into(),
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET capability handed to every adapter.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Network failures are errors; any status code is a response.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// GET that turns a non-2xx status into [`ConfluenceError::Upstream`].
pub async fn get_ok(
    fetcher: &dyn Fetcher,
    source_name: &str,
    url: &str,
    headers: &[(&str, &str)],
) -> Result<String> {
    let response = fetcher.get(url, headers).await?;
    if !response.is_success() {
        return Err(ConfluenceError::Upstream {
            source_name: source_name.to_string(),
            status: response.status,
            reason: response.reason,
        });
    }
    Ok(response.body)
}

pub async fn get_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    source_name: &str,
    url: &str,
    headers: &[(&str, &str)],
) -> Result<T> {
    let body = get_ok(fetcher, source_name, url, headers).await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_ok_maps_status_to_error() {
        let fetcher = StubFetcher::new()
            .with_response("https://a.test/ok", HttpResponse::ok("fine"))
            .with_response(
                "https://a.test/limited",
                HttpResponse::with_status(429, "Too Many Requests"),
            );

        let body = get_ok(&fetcher, "Test", "https://a.test/ok", &[]).await.unwrap();
        assert_eq!(body, "fine");

        let err = get_ok(&fetcher, "Test", "https://a.test/limited", &[])
            .await
            .unwrap_err();
        match err {
            ConfluenceError::Upstream {
                source_name,
                status,
                reason,
            } => {
                assert_eq!(source_name, "Test");
                assert_eq!(status, 429);
                assert_eq!(reason, "Too Many Requests");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_json_reports_malformed_payload() {
        let fetcher = StubFetcher::new().with_body("https://a.test/json", "{not json");
        let result: Result<Vec<u64>> = get_json(&fetcher, "Test", "https://a.test/json", &[]).await;
        assert!(matches!(result, Err(ConfluenceError::Json(_))));
    }
}
