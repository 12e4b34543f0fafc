//! Per-layer rendezvous
//!
//! A [`LayerBarrier`] counts the work still outstanding for one BFS layer.
//! Every download registers before it is admitted, and a download that
//! spawns an extraction registers the extraction *before* deregistering
//! itself, so the count cannot touch zero while work for the layer remains.
//! The orchestrator awaits [`LayerBarrier::await_drain`] and only then
//! starts the next layer.
//!
//! A fresh barrier is created for every layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counting barrier for the tasks of one layer
#[derive(Debug, Default)]
pub struct LayerBarrier {
    registered: AtomicUsize,
    drained: Notify,
}

impl LayerBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one outstanding unit of work
    pub fn register(&self) {
        self.registered.fetch_add(1, Ordering::AcqRel);
    }

    /// Deregisters one unit, waking waiters when the count reaches zero
    pub fn arrive_and_deregister(&self) {
        let previous = self.registered.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "barrier deregistered more than registered");
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Registers one unit and returns a guard that deregisters it on drop
    pub fn enter(self: &Arc<Self>) -> BarrierUnit {
        self.register();
        BarrierUnit {
            barrier: Arc::clone(self),
        }
    }

    /// Number of units currently registered
    pub fn outstanding(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    /// Waits until every registered unit has deregistered
    ///
    /// Returns immediately when nothing is registered.
    pub async fn await_drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Enabled before the check so a wake-up between the load and the
            // await is not lost.
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One registered unit of a [`LayerBarrier`]
///
/// Dropping the unit deregisters it. Units travel inside the jobs they
/// account for, so a job that is rejected by a closed pool, aborted during
/// shutdown, or panics still deregisters.
#[derive(Debug)]
pub struct BarrierUnit {
    barrier: Arc<LayerBarrier>,
}

impl BarrierUnit {
    /// Deregisters this unit now
    pub fn arrive(self) {
        drop(self);
    }
}

impl Drop for BarrierUnit {
    fn drop(&mut self) {
        self.barrier.arrive_and_deregister();
    }
}
