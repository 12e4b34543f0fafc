//! Layercrawl: a layered, host-throttled web crawler
//!
//! This crate implements a concurrent breadth-first crawler that downloads pages
//! layer by layer, extracts their links on a separate worker pool, and bounds
//! the number of simultaneous downloads against any single host.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Top-level error type for constructing and driving a crawler
///
/// Per-URL failures never surface here; they are collected in
/// [`output::CrawlResult::errors`] as [`CrawlError`] values.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawler must be created inside a tokio runtime")]
    NoRuntime,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {message}")]
    Parse { url: String, message: String },

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Failure reported by a [`crawler::Downloader`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    ContentMismatch { url: String, content_type: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

/// Failure reported by [`crawler::Document::extract_links`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Invalid base URL '{0}'")]
    InvalidBase(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("{0}")]
    Other(String),
}

/// Why a single URL ended up in a crawl's error map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("Malformed URL: {0}")]
    Malformed(#[from] UrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Link extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Task for {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

/// Coarse classification of a [`CrawlError`], used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Malformed,
    Fetch,
    Extraction,
    Aborted,
}

impl CrawlError {
    /// Returns the coarse kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Aborted { .. } => ErrorKind::Aborted,
        }
    }
}

/// Result type alias for crawler construction and CLI operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, Document, Downloader, HtmlDocument, HttpDownloader};
pub use output::CrawlResult;
pub use state::CrawlState;
pub use url::host_of;
