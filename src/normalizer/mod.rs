//! Payload normalization shared by the adapters.
//!
//! Nothing here raises for a missing field: lookups degrade to an empty
//! string, zero or `None`. Only a payload that cannot be parsed at all is
//! reported as an error.

pub mod feed;
pub mod html;
pub mod text;
pub mod time;
pub mod xml;

pub use feed::{parse_syndication, SyndicationEntry};
pub use html::{parse_trending, TrendingRepo};
pub use text::{clean_text, collapse_whitespace, parse_count, strip_html, summarize_html, truncate};
pub use time::{parse_date_str, parse_timestamp, IntoTimestamp};
pub use xml::{ensure_array, extract_link, extract_text, parse_xml, XmlElement, XmlNode};
