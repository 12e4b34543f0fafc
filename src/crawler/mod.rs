//! Crawler module for layered, host-throttled crawling
//!
//! This module contains the core crawling machinery:
//! - The layer-by-layer orchestrator ([`Crawler`])
//! - Per-host admission control ([`HostThrottle`])
//! - The per-layer rendezvous ([`LayerBarrier`])
//! - Fixed-size worker pools for downloads and link extraction
//! - The [`Downloader`] / [`Document`] capabilities it drives, with
//!   HTTP and HTML implementations of both

mod barrier;
mod coordinator;
mod fetcher;
mod parser;
mod pool;
mod throttle;
mod traits;

pub use barrier::{BarrierUnit, LayerBarrier};
pub use coordinator::{Crawler, DEFAULT_SHUTDOWN_GRACE};
pub use fetcher::HttpDownloader;
pub use parser::{extract_links, HtmlDocument};
pub use pool::{Job, PoolClosed, WorkerPool};
pub use throttle::{HostThrottle, ThrottleSlot};
pub use traits::{Document, Downloader};
