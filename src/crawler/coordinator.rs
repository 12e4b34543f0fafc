//! Crawler coordinator - layered crawl orchestration
//!
//! This module contains the breadth-first crawl loop and the bodies of the
//! two kinds of jobs it schedules:
//! - Download jobs run on the download pool, admitted through the host's throttle
//! - Extraction jobs run on the extraction pool and feed the next layer's frontier
//!
//! A layer is finished only when every download registered for it, and every
//! extraction those downloads spawned, has deregistered from the layer's barrier.

use crate::config::{validation, CrawlerConfig};
use crate::crawler::barrier::{BarrierUnit, LayerBarrier};
use crate::crawler::pool::WorkerPool;
use crate::crawler::throttle::HostThrottle;
use crate::crawler::traits::{Document, Downloader};
use crate::output::CrawlResult;
use crate::state::CrawlState;
use crate::url::host_of;
use crate::{CrawlError, CrawlerError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Grace period `close` gives each pool before aborting its workers
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(10);

/// Layered, host-throttled web crawler
///
/// A crawler owns two worker pools that outlive individual crawls: one for
/// downloads and one for link extraction, so slow parsing never holds up
/// download throughput. Many [`download`](Self::download) calls may share
/// one crawler, concurrently or in sequence.
///
/// Call [`close`](Self::close) at end of life. Dropping an unclosed crawler
/// aborts its workers without a grace period.
pub struct Crawler {
    downloader: Arc<dyn Downloader>,
    per_host: usize,
    downloads: Arc<WorkerPool>,
    extractions: Arc<WorkerPool>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    grace: Duration,
}

/// Per-layer bookkeeping shared by that layer's jobs
struct Layer {
    index: usize,
    need_extract: bool,
    barrier: Arc<LayerBarrier>,
    next: Mutex<Vec<String>>,
}

impl Layer {
    fn new(index: usize, need_extract: bool) -> Self {
        Self {
            index,
            need_extract,
            barrier: Arc::new(LayerBarrier::new()),
            next: Mutex::new(Vec::new()),
        }
    }

    fn push_next(&self, links: Vec<String>) {
        self.next
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(links);
    }

    fn take_next(&self) -> Vec<String> {
        std::mem::take(&mut *self.next.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Everything a download job needs besides its URL
struct JobContext {
    downloader: Arc<dyn Downloader>,
    extractions: Arc<WorkerPool>,
    state: Arc<CrawlState>,
    layer: Arc<Layer>,
}

impl Crawler {
    /// Creates a crawler with the given pool sizes and per-host limit
    ///
    /// Must be called inside a tokio runtime; the pools' workers are spawned
    /// on it immediately.
    ///
    /// # Errors
    ///
    /// * `CrawlerError::Config` - a size or the per-host limit is zero or too large
    /// * `CrawlerError::NoRuntime` - called outside a tokio runtime
    pub fn new(
        downloader: Arc<dyn Downloader>,
        downloaders: usize,
        extractors: usize,
        per_host: usize,
    ) -> Result<Self, CrawlerError> {
        Self::build(
            downloader,
            downloaders,
            extractors,
            per_host,
            DEFAULT_SHUTDOWN_GRACE,
        )
    }

    /// Creates a crawler from the `[crawler]` configuration section
    pub fn from_config(
        downloader: Arc<dyn Downloader>,
        config: &CrawlerConfig,
    ) -> Result<Self, CrawlerError> {
        validation::validate_crawler_config(config)?;
        Self::build(
            downloader,
            config.downloaders,
            config.extractors,
            config.per_host,
            Duration::from_millis(config.shutdown_grace_ms),
        )
    }

    fn build(
        downloader: Arc<dyn Downloader>,
        downloaders: usize,
        extractors: usize,
        per_host: usize,
        grace: Duration,
    ) -> Result<Self, CrawlerError> {
        validation::validate_worker_count("downloaders", downloaders)?;
        validation::validate_worker_count("extractors", extractors)?;
        validation::validate_worker_count("per-host", per_host)?;
        tokio::runtime::Handle::try_current().map_err(|_| CrawlerError::NoRuntime)?;

        tracing::debug!(
            "Starting crawler: {} downloaders, {} extractors, {} per host",
            downloaders,
            extractors,
            per_host
        );

        Ok(Self {
            downloader,
            per_host,
            downloads: Arc::new(WorkerPool::spawn("download", downloaders)),
            extractions: Arc::new(WorkerPool::spawn("extraction", extractors)),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
            grace,
        })
    }

    /// Crawls `depth` layers starting at `seed`, across any host
    ///
    /// Never fails: per-URL problems are collected in the result's error map.
    pub async fn download(&self, seed: &str, depth: usize) -> CrawlResult {
        self.crawl(seed, depth, CrawlState::unrestricted()).await
    }

    /// Crawls `depth` layers starting at `seed`, touching only `hosts`
    ///
    /// URLs on other hosts, the seed included, are skipped silently and
    /// never reach the downloader.
    pub async fn download_restricted<I, S>(
        &self,
        seed: &str,
        depth: usize,
        hosts: I,
    ) -> CrawlResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crawl(seed, depth, CrawlState::new(Some(hosts))).await
    }

    /// Runs the layer loop
    ///
    /// 1. Mark the seed visited and make it the first frontier
    /// 2. For each layer, schedule every frontier URL through its host's throttle
    /// 3. Wait for the layer's barrier to drain (downloads and their extractions)
    /// 4. The links collected during the layer become the next frontier
    ///
    /// If the crawler is closed before or during a layer, the crawl is
    /// abandoned and whatever finished so far is returned with `abandoned` set.
    async fn crawl(&self, seed: &str, depth: usize, state: CrawlState) -> CrawlResult {
        let state = Arc::new(state);
        let started = Instant::now();
        let mut frontier_sizes = Vec::new();

        if self.shutdown.is_cancelled() {
            tracing::warn!("Crawler is closed, not crawling {}", seed);
            return state.snapshot(frontier_sizes, true);
        }

        if depth == 0 {
            tracing::warn!("Depth 0 requested for {}, nothing to crawl", seed);
            return state.snapshot(frontier_sizes, false);
        }

        state.mark_visited(seed);
        let mut frontier = vec![seed.to_string()];

        for index in 1..=depth {
            if frontier.is_empty() {
                tracing::debug!("Frontier exhausted before layer {}", index);
                break;
            }

            if self.shutdown.is_cancelled() {
                tracing::warn!(
                    "Crawl of {} abandoned before layer {} ({} URLs unscheduled)",
                    seed,
                    index,
                    frontier.len()
                );
                return state.snapshot(frontier_sizes, true);
            }

            let layer = Arc::new(Layer::new(index, index < depth));
            frontier_sizes.push(frontier.len());
            tracing::info!("Layer {}/{}: {} URLs", index, depth, frontier.len());

            for url in frontier.drain(..) {
                self.schedule(&state, &layer, url);
            }

            let drained = tokio::select! {
                biased;
                _ = layer.barrier.await_drain() => true,
                _ = self.shutdown.cancelled() => false,
            };

            // Jobs rejected by closed pools also drain the barrier, so a
            // drained layer still counts as abandoned once the crawler is closed.
            if !drained || self.shutdown.is_cancelled() {
                tracing::warn!(
                    "Crawl of {} abandoned during layer {} ({} tasks outstanding)",
                    seed,
                    index,
                    layer.barrier.outstanding()
                );
                return state.snapshot(frontier_sizes, true);
            }

            frontier = layer.take_next();
            tracing::info!(
                "Layer {} done: {} downloaded, {} errors, {} new links ({:.2?} elapsed)",
                layer.index,
                state.downloaded_count(),
                state.error_count(),
                frontier.len(),
                started.elapsed()
            );
        }

        let result = state.snapshot(frontier_sizes, false);
        tracing::info!(
            "Crawl of {} completed: {} pages downloaded, {} errors across {} hosts in {:.2?}",
            seed,
            result.downloaded.len(),
            result.errors.len(),
            state.host_count(),
            started.elapsed()
        );
        result
    }

    /// Routes one frontier URL to its host's throttle
    fn schedule(&self, state: &Arc<CrawlState>, layer: &Arc<Layer>, url: String) {
        let host = match host_of(&url) {
            Ok(host) => host,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", url, e);
                state.record_error(&url, e.into());
                return;
            }
        };

        if !state.is_host_allowed(&host) {
            tracing::trace!("Skipping {}: host {} not allowed", url, host);
            return;
        }

        let throttle = state.throttle_for(&host, self.per_host, &self.downloads);
        let unit = layer.barrier.enter();
        let context = JobContext {
            downloader: Arc::clone(&self.downloader),
            extractions: Arc::clone(&self.extractions),
            state: Arc::clone(state),
            layer: Arc::clone(layer),
        };

        throttle.admit(Box::pin(download_page(
            context,
            url,
            Arc::clone(&throttle),
            unit,
        )));
    }

    /// Stops both pools
    ///
    /// Cancels the crawler first, which abandons any crawl waiting on a
    /// layer and makes further submissions fail quietly. Then each pool gets
    /// the grace period to drain before its workers are aborted. Calling
    /// this more than once is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Crawler already closed");
            return;
        }

        tracing::info!("Shutting down crawler");
        self.shutdown.cancel();
        self.downloads.shutdown(self.grace).await;
        self.extractions.shutdown(self.grace).await;
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn per_host(&self) -> usize {
        self.per_host
    }

    pub fn downloaders(&self) -> usize {
        self.downloads.size()
    }

    pub fn extractors(&self) -> usize {
        self.extractions.size()
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.cancel();
            self.downloads.abort();
            self.extractions.abort();
        }
    }
}

/// Download job body
///
/// The throttle slot is held for the whole job and released last; the
/// layer unit is deregistered only after any extraction has registered.
async fn download_page(
    context: JobContext,
    url: String,
    throttle: Arc<HostThrottle>,
    unit: BarrierUnit,
) {
    let _slot = throttle.slot();

    let fetched = AssertUnwindSafe(context.downloader.download(&url))
        .catch_unwind()
        .await;

    match fetched {
        Ok(Ok(document)) => {
            context.state.record_download(&url);
            tracing::debug!("Downloaded {}", url);

            if context.layer.need_extract {
                let extraction = context.layer.barrier.enter();
                let job = extract_links(
                    Arc::clone(&context.state),
                    Arc::clone(&context.layer),
                    url.clone(),
                    document,
                    extraction,
                );
                if let Err(e) = context.extractions.submit(Box::pin(job)) {
                    tracing::debug!("Dropping extraction for {}: {}", url, e);
                }
            }
        }
        Ok(Err(e)) => {
            tracing::debug!("Failed to download {}: {}", url, e);
            context.state.record_error(&url, e.into());
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Downloader panicked on {}: {}", url, message);
            let error = CrawlError::Aborted {
                url: url.clone(),
                message,
            };
            context.state.record_error(&url, error);
        }
    }

    unit.arrive();
}

/// Extraction job body
///
/// Only links this job is first to mark visited join the next frontier.
/// A failure is recorded against the page the links came from.
async fn extract_links(
    state: Arc<CrawlState>,
    layer: Arc<Layer>,
    url: String,
    document: Box<dyn Document>,
    unit: BarrierUnit,
) {
    match tokio::task::spawn_blocking(move || document.extract_links()).await {
        Ok(Ok(links)) => {
            let found = links.len();
            let fresh: Vec<String> = links
                .into_iter()
                .filter(|link| state.mark_visited(link))
                .collect();
            tracing::trace!("{}: {} links, {} new", url, found, fresh.len());
            layer.push_next(fresh);
        }
        Ok(Err(e)) => {
            tracing::debug!("Failed to extract links from {}: {}", url, e);
            state.record_error(&url, e.into());
        }
        Err(e) => {
            tracing::error!("Link extraction for {} did not complete: {}", url, e);
            let error = CrawlError::Aborted {
                url: url.clone(),
                message: e.to_string(),
            };
            state.record_error(&url, error);
        }
    }

    unit.arrive();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
