use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfluenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} responded with {status} {reason}")]
    Upstream {
        source_name: String,
        status: u16,
        reason: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Adapter already registered: {0}")]
    DuplicateAdapter(String),

    #[error("No adapter registered for source: {0}")]
    UnknownSource(String),

    #[error("All proxies failed: {}", .0.join("; "))]
    AllProxiesFailed(Vec<String>),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ConfluenceError>;
