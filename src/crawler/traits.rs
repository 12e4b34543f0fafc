//! Capabilities the crawl core consumes
//!
//! The crawler never talks HTTP or parses HTML itself. It drives a
//! [`Downloader`] that turns a URL into a [`Document`], and asks each
//! document for its outbound links.

use crate::{ExtractError, FetchError};
use async_trait::async_trait;

/// A downloaded page that can report its outbound links
pub trait Document: Send + Sync {
    /// Returns the absolute URLs this page links to
    ///
    /// Called on a blocking thread, so implementations are free to do
    /// CPU-heavy parsing here.
    fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}

/// Fetches a URL and returns its document
///
/// Any failure (network, timeout, unexpected content) is reported as a
/// [`FetchError`]; the crawler records it against the URL and moves on.
/// Timeouts belong to the implementation, the crawler imposes none.
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError>;
}
