//! Debounced background writes.
//!
//! A scheduled job waits out the quiet period on the runtime. Scheduling again
//! before the period elapses aborts the waiting task and starts a new one, so
//! a burst of changes produces one write. A job that has already started
//! writing is never aborted.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Publishes whether any write is scheduled or running.
#[derive(Debug)]
pub struct SyncFlag {
    outstanding: Mutex<usize>,
    tx: watch::Sender<bool>,
}

impl Default for SyncFlag {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            outstanding: Mutex::new(0),
            tx,
        }
    }
}

impl SyncFlag {
    pub fn is_syncing(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Mark one write outstanding until the guard drops.
    pub fn acquire(self: &Arc<Self>) -> SyncGuard {
        let mut outstanding = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *outstanding += 1;
        self.tx.send_replace(true);
        SyncGuard {
            flag: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut outstanding = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.tx.send_replace(false);
        }
    }
}

/// Keeps the sync flag raised while alive.
#[derive(Debug)]
pub struct SyncGuard {
    flag: Arc<SyncFlag>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.flag.release();
    }
}

/// A scheduled job that has not finished.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

impl PendingWrite {
    /// Whether the quiet period elapsed and the job is running.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Abort if still waiting. Returns `true` when the job will not run.
    pub fn cancel(&self) -> bool {
        if self.has_started() {
            return false;
        }
        self.handle.abort();
        true
    }

    /// Wait for the job to finish.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::error!("Persistence task failed: {}", e);
            }
        }
    }
}

/// Owns at most one pending debounced job.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    runtime: Handle,
    flag: Arc<SyncFlag>,
    pending: Option<PendingWrite>,
}

impl Debouncer {
    pub fn new(delay: Duration, runtime: Handle, flag: Arc<SyncFlag>) -> Self {
        Self {
            delay,
            runtime,
            flag,
            pending: None,
        }
    }

    /// Run `job` after the quiet period, replacing any job still waiting.
    pub fn schedule<F, Fut>(&mut self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Raise the flag before dropping the old guard so it never flickers off.
        let guard = self.flag.acquire();
        if let Some(previous) = self.pending.take() {
            if previous.cancel() {
                tracing::trace!("Rescheduled pending write");
            }
        }

        let started = Arc::new(AtomicBool::new(false));
        let started_flag = Arc::clone(&started);
        let delay = self.delay;

        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            started_flag.store(true, Ordering::SeqCst);
            job().await;
        });

        self.pending = Some(PendingWrite { handle, started });
    }

    /// Abort the waiting job, if any. Returns `true` if one was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => pending.cancel(),
            None => false,
        }
    }

    /// Detach the pending job so the caller can run or await it.
    pub fn take_pending(&mut self) -> Option<PendingWrite> {
        self.pending.take()
    }
}
