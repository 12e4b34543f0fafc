use crate::crawler::{HostThrottle, WorkerPool};
use crate::output::CrawlResult;
use crate::CrawlError;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Shared state of one crawl invocation
///
/// All collections are safe to touch from any worker. Membership tests on
/// `visited` and get-or-create on the throttle map are single atomic
/// operations, never a read followed by a write.
pub struct CrawlState {
    /// Every URL ever queued for download in this crawl
    visited: DashSet<String>,

    /// URLs whose host derivation, fetch, or link extraction failed
    errors: DashMap<String, CrawlError>,

    /// URLs fetched successfully, in completion order
    downloaded: Mutex<Vec<String>>,

    /// Hosts the crawl may touch; `None` means unrestricted
    allowed_hosts: Option<HashSet<String>>,

    /// One throttle per host, created on first use
    throttles: DashMap<String, Arc<HostThrottle>>,
}

impl CrawlState {
    /// Creates an empty state, optionally restricted to `allowed_hosts`
    ///
    /// Hosts are matched case-insensitively.
    pub fn new<I, S>(allowed_hosts: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            visited: DashSet::new(),
            errors: DashMap::new(),
            downloaded: Mutex::new(Vec::new()),
            allowed_hosts: allowed_hosts.map(|hosts| {
                hosts
                    .into_iter()
                    .map(|host| host.into().to_ascii_lowercase())
                    .collect()
            }),
            throttles: DashMap::new(),
        }
    }

    /// Creates an unrestricted state
    pub fn unrestricted() -> Self {
        Self::new(None::<Vec<String>>)
    }

    /// Marks a URL visited
    ///
    /// Returns `true` only for the caller that inserted it; that caller
    /// owns the right to schedule the URL.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Whether the allow-list (if any) admits `host`
    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts
            .as_ref()
            .map_or(true, |hosts| hosts.contains(host))
    }

    /// Records a successful fetch
    pub fn record_download(&self, url: &str) {
        self.downloaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
    }

    /// Records a failure against `url`
    pub fn record_error(&self, url: &str, error: CrawlError) {
        if let Some(previous) = self.errors.insert(url.to_string(), error) {
            tracing::debug!("Replaced earlier error for {}: {}", url, previous);
        }
    }

    /// Returns the throttle for `host`, creating it if this is the first
    /// download against that host
    pub fn throttle_for(
        &self,
        host: &str,
        limit: usize,
        pool: &Arc<WorkerPool>,
    ) -> Arc<HostThrottle> {
        self.throttles
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HostThrottle::new(host, limit, Arc::clone(pool))))
            .value()
            .clone()
    }

    /// Number of distinct hosts that have been throttled so far
    pub fn host_count(&self) -> usize {
        self.throttles.len()
    }

    pub fn downloaded_count(&self) -> usize {
        self.downloaded.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Copies the current successes and errors into a standalone result
    ///
    /// Workers that outlive an abandoned crawl may keep writing to this
    /// state; the returned snapshot is unaffected.
    pub fn snapshot(&self, frontier_sizes: Vec<usize>, abandoned: bool) -> CrawlResult {
        let downloaded = self
            .downloaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let errors = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        CrawlResult {
            downloaded,
            errors,
            frontier_sizes,
            abandoned,
        }
    }
}
