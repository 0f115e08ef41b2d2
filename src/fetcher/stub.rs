use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{ConfluenceError, Result};
use crate::fetcher::{Fetcher, HttpResponse};

/// Fetcher serving canned responses keyed by exact URL, for offline runs
/// and tests. Unknown URLs fail like a network error.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(url, HttpResponse::ok(body))
    }

    /// URLs requested so far, in call order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default()
    }

    /// Headers sent with the most recent request to `url`.
    pub fn headers_for(&self, url: &str) -> Option<Vec<(String, String)>> {
        self.requests.lock().ok().and_then(|r| {
            r.iter()
                .rev()
                .find(|(u, _)| u == url)
                .map(|(_, headers)| headers.clone())
        })
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
        }

        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ConfluenceError::Other(format!("connection refused: {}", url)))
    }
}
