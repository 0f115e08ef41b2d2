use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::{Adapter, FetchOptions, ProviderOptions, BROWSER_USER_AGENT};
use crate::app::Result;
use crate::domain::{FeedItem, SourceType};
use crate::fetcher::{get_ok, Fetcher};
use crate::normalizer::{clean_text, parse_trending, TrendingRepo};

pub const TRENDING_URL: &str = "https://github.com/trending";
const SUMMARY_LEN: usize = 200;

/// Trending repositories, scraped from the HTML page. No publish date is
/// available, so these items sort after dated ones.
pub struct GitHubAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl GitHubAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn trending_url(language: Option<&str>) -> String {
        match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => format!(
                "{}/{}?since=daily",
                TRENDING_URL,
                lang.to_lowercase().replace(' ', "-")
            ),
            None => format!("{}?since=daily", TRENDING_URL),
        }
    }

    fn to_item(&self, repo: TrendingRepo) -> FeedItem {
        let full_name = repo.full_name();
        let mut item = FeedItem::new(
            FeedItem::make_id(self.name(), &full_name),
            full_name.clone(),
            SourceType::GitHub,
            format!("https://github.com/{}", full_name),
        );
        item.summary = Some(clean_text(&repo.description, Some(SUMMARY_LEN))).filter(|s| !s.is_empty());
        item.tags = repo.language.into_iter().collect();
        item.score = Some(repo.stars);
        item.author = Some(repo.owner);
        item
    }
}

#[async_trait]
impl Adapter for GitHubAdapter {
    fn name(&self) -> &str {
        SourceType::GitHub.as_str()
    }

    async fn fetch_items(&self, options: &FetchOptions) -> Result<Vec<FeedItem>> {
        let language = match &options.provider {
            ProviderOptions::GitHub { language } => language.as_deref(),
            _ => None,
        };

        let url = Self::trending_url(language);
        let headers = [
            ("User-Agent", BROWSER_USER_AGENT),
            ("Accept", "text/html"),
        ];
        let html = get_ok(self.fetcher.as_ref(), self.name(), &url, &headers).await?;

        let items: Vec<FeedItem> = parse_trending(&html)
            .into_iter()
            .take(options.count)
            .map(|repo| self.to_item(repo))
            .collect();

        tracing::info!("[{}] fetched {} items", self.name(), items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StubFetcher;

    const PAGE: &str = r#"<html><body>
<article class="Box-row">
  <h2><a href="/rust-lang/rust">rust-lang / rust</a></h2>
  <p>Empowering everyone to build reliable software.</p>
  <span itemprop="programmingLanguage">Rust</span>
  <a href="/rust-lang/rust/stargazers">98,765</a>
</article>
<article class="Box-row">
  <h2><a href="/tokio-rs/tokio">tokio-rs / tokio</a></h2>
  <a href="/tokio-rs/tokio/stargazers">25.1k</a>
</article>
<article class="Box-row">
  <h2><a href="/serde-rs/serde">serde-rs / serde</a></h2>
</article>
</body></html>"#;

    #[test]
    fn test_trending_url() {
        assert_eq!(
            GitHubAdapter::trending_url(None),
            "https://github.com/trending?since=daily"
        );
        assert_eq!(
            GitHubAdapter::trending_url(Some("Rust")),
            "https://github.com/trending/rust?since=daily"
        );
        assert_eq!(
            GitHubAdapter::trending_url(Some("  ")),
            "https://github.com/trending?since=daily"
        );
    }

    #[tokio::test]
    async fn test_scrapes_rows_with_user_agent() {
        let url = GitHubAdapter::trending_url(None);
        let fetcher = Arc::new(StubFetcher::new().with_body(url.clone(), PAGE));
        let adapter = GitHubAdapter::new(fetcher.clone());

        let items = adapter.fetch(&FetchOptions::new(2)).await;
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.id, "github-rust-lang/rust");
        assert_eq!(first.title, "rust-lang/rust");
        assert_eq!(first.url, "https://github.com/rust-lang/rust");
        assert_eq!(
            first.summary.as_deref(),
            Some("Empowering everyone to build reliable software.")
        );
        assert_eq!(first.tags, vec!["Rust"]);
        assert_eq!(first.score, Some(98_765));
        assert_eq!(first.published_at, None);

        assert_eq!(items[1].score, Some(25_100));
        assert_eq!(items[1].summary, None);
        assert!(items[1].tags.is_empty());

        let headers = fetcher.headers_for(&url).unwrap();
        assert!(headers
            .iter()
            .any(|(k, v)| k == "User-Agent" && v == BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn test_language_selects_path() {
        let url = GitHubAdapter::trending_url(Some("go"));
        let fetcher = Arc::new(StubFetcher::new().with_body(url.clone(), PAGE));
        let adapter = GitHubAdapter::new(fetcher.clone());

        let options = FetchOptions::new(10).with_provider(ProviderOptions::GitHub {
            language: Some("go".into()),
        });
        assert_eq!(adapter.fetch(&options).await.len(), 3);
        assert_eq!(fetcher.requested_urls(), vec![url]);
    }
}
