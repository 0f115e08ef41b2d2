use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::normalizer::text::{collapse_whitespace, parse_count};

static ROW: LazyLock<Selector> = LazyLock::new(|| selector("article.Box-row"));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static HEADING_ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("h1 a[href], h2 a[href]"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static LANGUAGE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="programmingLanguage"]"#));
static STARGAZERS: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href$="/stargazers"]"#));
static FORKS: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href$="/forks"]"#));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// One row of a trending-repositories page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingRepo {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
}

impl TrendingRepo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Extract repository rows from a trending page. Rows without a
/// recognizable `owner/repo` link are skipped; every other missing field
/// degrades to an empty string, `None` or zero.
pub fn parse_trending(html: &str) -> Vec<TrendingRepo> {
    let document = Html::parse_document(html);

    let mut rows: Vec<ElementRef<'_>> = document.select(&ROW).collect();
    if rows.is_empty() {
        rows = document.select(&ARTICLE).collect();
    }

    rows.into_iter().filter_map(parse_row).collect()
}

fn parse_row(row: ElementRef<'_>) -> Option<TrendingRepo> {
    let (owner, name) = row
        .select(&HEADING_ANCHOR)
        .chain(row.select(&ANCHOR))
        .find_map(|a| a.value().attr("href").and_then(repo_path))?;

    let description = row
        .select(&DESCRIPTION)
        .next()
        .map(|p| element_text(&p))
        .unwrap_or_default();

    let language = row
        .select(&LANGUAGE)
        .next()
        .map(|el| element_text(&el))
        .filter(|lang| !lang.is_empty());

    let stars = row
        .select(&STARGAZERS)
        .next()
        .map(|a| parse_count(&element_text(&a)))
        .unwrap_or(0);

    let forks = row
        .select(&FORKS)
        .next()
        .map(|a| parse_count(&element_text(&a)))
        .unwrap_or(0);

    Some(TrendingRepo {
        owner,
        name,
        description,
        language,
        stars,
        forks,
    })
}

/// `/owner/repo` → `(owner, repo)`; sponsor, stargazer and fork links are rejected.
fn repo_path(href: &str) -> Option<(String, String)> {
    let path = href
        .strip_prefix("https://github.com")
        .unwrap_or(href)
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if !path.starts_with('/') {
        return None;
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo]
            if !matches!(*owner, "sponsors" | "login" | "signup" | "topics" | "trending")
                && !matches!(*repo, "stargazers" | "forks" | "network") =>
        {
            Some((owner.to_string(), repo.to_string()))
        }
        _ => None,
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}
