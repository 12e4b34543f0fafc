//! Per-host admission control
//!
//! Each host gets its own [`HostThrottle`]. A throttle lets at most `limit`
//! downloads for its host sit in the download pool at once; anything beyond
//! that waits in a FIFO queue inside the throttle and is handed to the pool
//! when an earlier download for the same host releases its slot. Queued work
//! is simply not submitted yet, so waiting never blocks a thread.
//!
//! Every throttle has its own lock. Admission on one host never contends
//! with admission on another.

use crate::crawler::pool::{Job, WorkerPool};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct ThrottleInner {
    in_flight: usize,
    waiting: VecDeque<Job>,
}

/// Admission gate bounding concurrent downloads for one host
pub struct HostThrottle {
    host: String,
    limit: usize,
    pool: Arc<WorkerPool>,
    inner: Mutex<ThrottleInner>,
}

impl HostThrottle {
    /// Creates a throttle that submits admitted jobs to `pool`
    pub fn new(host: impl Into<String>, limit: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            host: host.into(),
            limit,
            pool,
            inner: Mutex::new(ThrottleInner::default()),
        }
    }

    /// Admits a job for this host
    ///
    /// If fewer than `limit` jobs are in flight, the job goes to the pool
    /// immediately; otherwise it is queued behind earlier jobs.
    ///
    /// Every admitted job must lead to exactly one [`release`](Self::release),
    /// normally through the [`ThrottleSlot`] it holds while running.
    pub fn admit(&self, job: Job) {
        let mut inner = self.lock();
        if inner.in_flight < self.limit {
            inner.in_flight += 1;
            self.dispatch(job);
        } else {
            inner.waiting.push_back(job);
            tracing::trace!(
                "Host {} at limit {}, {} queued",
                self.host,
                self.limit,
                inner.waiting.len()
            );
        }
    }

    /// Releases one in-flight slot
    ///
    /// The slot passes straight to the oldest queued job if there is one,
    /// so `in_flight` only drops when the queue is empty.
    pub fn release(&self) {
        let mut inner = self.lock();
        match inner.waiting.pop_front() {
            Some(job) => self.dispatch(job),
            None => inner.in_flight = inner.in_flight.saturating_sub(1),
        }
    }

    /// Returns a guard that calls [`release`](Self::release) when dropped
    pub fn slot(self: &Arc<Self>) -> ThrottleSlot {
        ThrottleSlot {
            throttle: Arc::clone(self),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of jobs currently admitted to the pool
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of jobs queued behind the limit
    pub fn waiting(&self) -> usize {
        self.lock().waiting.len()
    }

    // Called with the throttle lock held. Submission is non-blocking, and a
    // rejected job is dropped here; its drop glue must not touch this throttle.
    fn dispatch(&self, job: Job) {
        if let Err(e) = self.pool.submit(job) {
            tracing::debug!("Dropping download for host {}: {}", self.host, e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds one of a throttle's in-flight slots and releases it on drop
///
/// Created at the start of a download job, so the slot is released whether
/// the download succeeds, fails, or panics.
pub struct ThrottleSlot {
    throttle: Arc<HostThrottle>,
}

impl Drop for ThrottleSlot {
    fn drop(&mut self) {
        self.throttle.release();
    }
}
