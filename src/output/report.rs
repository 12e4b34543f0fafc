use crate::CrawlError;
use std::collections::HashMap;

/// Outcome of one crawl invocation
///
/// Every URL the crawl scheduled ends up in `downloaded`, in `errors`, or
/// in both (fetched, but link extraction failed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    /// Successfully fetched URLs, in completion order
    pub downloaded: Vec<String>,

    /// Failed URLs and the error recorded for each
    pub errors: HashMap<String, CrawlError>,

    /// Number of URLs handed to the scheduler for each processed layer
    pub frontier_sizes: Vec<usize>,

    /// Set when the crawler was closed before the crawl finished
    pub abandoned: bool,
}

impl CrawlResult {
    /// Whether the crawl ran every layer to completion
    pub fn is_complete(&self) -> bool {
        !self.abandoned
    }

    /// Number of layers that were started
    pub fn layers(&self) -> usize {
        self.frontier_sizes.len()
    }

    /// Failed URLs in lexicographic order
    pub fn failed_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }
}
