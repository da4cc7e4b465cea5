//! Delayed one-shot retries
//!
//! Each scheduled retry is a spawned task that sleeps for the fixed delay and
//! then runs its future, unless it is cancelled first. Every retry token is a
//! child of the shutdown token, so shutdown cancels all pending retries.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Schedules futures to run once after a fixed delay.
#[derive(Clone)]
pub struct RetryTimer {
    delay: Duration,
    shutdown: CancellationToken,
    pending: Arc<AtomicUsize>,
}

/// Handle to one scheduled retry. Dropping it leaves the retry scheduled.
pub struct RetryHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RetryTimer {
    pub fn new(delay: Duration, shutdown: CancellationToken) -> Self {
        Self {
            delay,
            shutdown,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of retries scheduled or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Run `task` once after the delay.
    pub fn schedule<F>(&self, task: F) -> RetryHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.shutdown.child_token();
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.pending.clone());
        let delay = self.delay;
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("retry cancelled before it ran");
                }
                _ = tokio::time::sleep(delay) => {
                    task.await;
                }
            }
        });

        RetryHandle { cancel, handle }
    }
}

impl RetryHandle {
    /// Cancel the retry if it has not started yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the retry has run or been cancelled.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            debug!(error = %e, "retry task ended abnormally");
        }
    }
}
