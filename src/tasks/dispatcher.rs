//! Background Job Dispatcher
//!
//! Runs backing-store write/delete callbacks as independent tokio tasks and
//! keeps count of how many are still outstanding.

use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

use crate::cache::backing::Job;
use crate::config::Backpressure;
use crate::error::{CacheError, Result};

// == Dispatcher ==
/// Fire-and-forget executor for [`Job`]s with an optional concurrency cap.
#[derive(Debug)]
pub struct Dispatcher {
    /// None = unbounded
    permits: Option<Arc<Semaphore>>,
    backpressure: Backpressure,
    /// Number of jobs scheduled but not yet finished
    pending: Arc<watch::Sender<usize>>,
}

impl Dispatcher {
    // == Constructor ==
    /// Creates a dispatcher allowing `max_in_flight` concurrent jobs (0 = unbounded).
    pub fn new(max_in_flight: usize, backpressure: Backpressure) -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            permits: (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight))),
            backpressure,
            pending: Arc::new(pending),
        }
    }

    // == Dispatch ==
    /// Schedules a job on its own task without suspending the caller.
    ///
    /// Must be called from within a tokio runtime. The concurrency cap bounds
    /// running callbacks, not scheduling: under [`Backpressure::Block`] the
    /// job is queued on its task until a slot frees up; under
    /// [`Backpressure::Reject`] a full dispatcher returns
    /// [`CacheError::Saturated`] and the job is dropped.
    pub fn dispatch<K, V>(&self, job: Job<K, V>) -> Result<()>
    where
        K: Debug + Send + 'static,
        V: Send + 'static,
    {
        let slot = self.reserve(&job)?;

        self.pending.send_modify(|count| *count += 1);
        debug!(kind = job.kind(), key = ?job.key(), "Scheduled background job");

        let pending = self.pending.clone();
        tokio::spawn(async move {
            let kind = job.kind();
            match slot.acquire().await {
                Ok(permit) => {
                    if let Err(err) = tokio::task::spawn_blocking(move || job.run()).await {
                        error!(kind, error = %err, "Background job failed");
                    }
                    pending.send_modify(|count| *count -= 1);
                    drop(permit);
                }
                Err(err) => {
                    error!(kind, error = %err, "Background job dropped");
                    pending.send_modify(|count| *count -= 1);
                }
            }
        });

        Ok(())
    }

    /// Claims a slot for `job` without waiting.
    fn reserve<K: Debug, V>(&self, job: &Job<K, V>) -> Result<Slot> {
        let Some(permits) = &self.permits else {
            return Ok(Slot::Unbounded);
        };

        match self.backpressure {
            Backpressure::Block => Ok(Slot::Queued(permits.clone())),
            Backpressure::Reject => permits
                .clone()
                .try_acquire_owned()
                .map(Slot::Held)
                .map_err(|_| {
                    CacheError::Saturated(format!("{} job for {:?} refused", job.kind(), job.key()))
                }),
        }
    }

    // == Pending ==
    /// Returns the number of jobs not yet finished.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    // == Wait Idle ==
    /// Waits until no jobs are outstanding.
    ///
    /// Jobs scheduled after this returns are not waited for. A callback that
    /// never returns keeps this waiting forever.
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// A job's claim on the concurrency cap.
enum Slot {
    Unbounded,
    /// Permit taken at dispatch time
    Held(OwnedSemaphorePermit),
    /// Permit taken by the job's task before it runs
    Queued(Arc<Semaphore>),
}

impl Slot {
    async fn acquire(self) -> Result<Option<OwnedSemaphorePermit>> {
        match self {
            Slot::Unbounded => Ok(None),
            Slot::Held(permit) => Ok(Some(permit)),
            Slot::Queued(permits) => permits
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|_| CacheError::Saturated("dispatcher closed".to_string())),
        }
    }
}
