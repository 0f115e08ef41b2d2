use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

pub const ELLIPSIS: &str = "...";

/// Plain text from an HTML fragment: drops script/style blocks and tags,
/// decodes entities and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, " ");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, " ");
    let without_tags = TAG.replace_all(&without_styles, " ");
    collapse_whitespace(&decode_html_entities(&without_tags))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace, trim, and cap at `max_len` characters (ellipsis included).
pub fn clean_text(text: &str, max_len: Option<usize>) -> String {
    let collapsed = collapse_whitespace(text);
    match max_len {
        Some(max) => truncate(&collapsed, max),
        None => collapsed,
    }
}

pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len < ELLIPSIS.len() {
        return ELLIPSIS[..max_len].to_string();
    }
    let keep = max_len - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

/// `Some(cleaned)` for non-blank HTML, `None` otherwise.
pub fn summarize_html(html: &str, max_len: usize) -> Option<String> {
    let text = strip_html(html);
    if text.is_empty() {
        None
    } else {
        Some(truncate(&text, max_len))
    }
}

/// Parse counters like `"12,345"`, `"1.5k"` or `"2M"`. Unreadable text is zero.
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect::<String>()
        .to_lowercase();

    let (number, multiplier) = if let Some(n) = cleaned.strip_suffix('k') {
        (n, 1_000.0)
    } else if let Some(n) = cleaned.strip_suffix('m') {
        (n, 1_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier).round() as u64,
        _ => 0,
    }
}
