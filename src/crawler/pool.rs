//! Fixed-size worker pools
//!
//! A pool is a fixed number of long-lived tokio tasks pulling jobs off one
//! shared queue, so the number of jobs running at once never exceeds the
//! pool size while submission itself never waits.
//!
//! The queue is unbounded. Download workers submit same-host work back into
//! their own pool when they finish, so submission must never wait on the
//! workers themselves.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A unit of work runnable on a [`WorkerPool`]
pub type Job = BoxFuture<'static, ()>;

/// Returned when a job is submitted to a pool that has been shut down
///
/// The rejected job is dropped, which runs the drop glue of everything it
/// captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker pool '{0}' is shut down")]
pub struct PoolClosed(pub &'static str);

/// A fixed number of workers sharing one job queue
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers on the current tokio runtime
    ///
    /// Callers are responsible for checking that `size >= 1` and that a
    /// runtime is available; see [`crate::crawler::Crawler::new`].
    pub(crate) fn spawn(name: &'static str, size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = std::sync::Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|index| {
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    loop {
                        // Only the lock holder waits on the queue; the guard is
                        // released before the job runs.
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else {
                            break;
                        };

                        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                            tracing::error!("Job panicked on {} worker {}", name, index);
                        }
                    }
                    tracing::trace!("{} worker {} stopped", name, index);
                })
            })
            .collect();

        Self {
            name,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues a job for execution
    pub fn submit(&self, job: Job) -> Result<(), PoolClosed> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| PoolClosed(self.name)),
            None => Err(PoolClosed(self.name)),
        }
    }

    /// Number of workers this pool was created with
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the pool still accepts jobs
    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Stops accepting jobs, then waits up to `grace` for the workers to drain
    /// the queue before aborting whatever is still running
    pub async fn shutdown(&self, grace: Duration) {
        self.close_queue();

        let mut workers = {
            let mut guard = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        let name = self.name;
        let drained = tokio::time::timeout(grace, async {
            for (index, worker) in workers.iter_mut().enumerate() {
                if let Err(e) = worker.await {
                    tracing::debug!("{} worker {} ended abnormally: {}", name, index, e);
                }
            }
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                "{} pool did not drain within {:?}, aborting workers",
                self.name,
                grace
            );
            for worker in &workers {
                worker.abort();
            }
        }
    }

    /// Stops accepting jobs and aborts every worker immediately
    pub fn abort(&self) {
        self.close_queue();
        for worker in self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
        {
            worker.abort();
        }
    }

    fn close_queue(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}
