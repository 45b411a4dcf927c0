use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Bounded pool for processing jobs.
///
/// - `try_reserve()` never waits: a saturated (or closed) pool answers `None`
///   right away, so the caller path stays non-blocking.
/// - A reserved slot is held by the spawned job until it finishes.
/// - `close_and_drain()` stops taking new jobs and waits for the running ones
///   (in-flight jobs are never cancelled).
pub struct ProcessingPool {
    slots: Arc<Semaphore>,
    size: usize,
    closed: AtomicBool,
}

impl ProcessingPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
            closed: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs currently running.
    pub fn busy(&self) -> usize {
        self.size - self.slots.available_permits()
    }

    pub fn try_reserve(&self) -> Option<PoolSlot> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .ok()
            .map(|permit| PoolSlot { permit })
    }

    /// Stop accepting jobs and wait (up to `timeout`) for running jobs.
    ///
    /// Returns false if jobs were still running when the timeout hit.
    pub async fn close_and_drain(&self, timeout: Duration) -> bool {
        self.closed.store(true, Ordering::Release);
        let size = u32::try_from(self.size).unwrap_or(u32::MAX);
        match tokio::time::timeout(timeout, self.slots.acquire_many(size)).await {
            Ok(Ok(all)) => {
                drop(all);
                true
            }
            _ => false,
        }
    }
}

/// A reserved place in the pool.
#[must_use = "an unused slot is returned to the pool on drop"]
pub struct PoolSlot {
    permit: OwnedSemaphorePermit,
}

impl PoolSlot {
    /// Run `job` on the runtime; the slot is released when it finishes.
    pub fn spawn<F>(self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.permit;
        tokio::spawn(async move {
            let _permit = permit;
            job.await;
        })
    }
}
