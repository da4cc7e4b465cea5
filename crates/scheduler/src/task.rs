//! Periodic posting loop
//!
//! Every tick runs one `PostJob` attempt. A network-class failure schedules
//! exactly one delayed repeat of the same attempt; the repeat never schedules
//! another. All other failures are logged and dropped until the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::job::{Outcome, PostJob};
use crate::retry::{RetryHandle, RetryTimer};

/// Record an attempt outcome in the `tweets_total` counter.
fn record_outcome(outcome: &'static str) {
    metrics::counter!("tweets_total", "outcome" => outcome).increment(1);
}

fn log_result(result: &Result<Outcome>, is_retry: bool) {
    match result {
        Ok(Outcome::Posted { id }) => {
            info!(id = ?id, is_retry, "message posted");
            record_outcome("posted");
        }
        Ok(Outcome::Skipped) => {
            info!(is_retry, "attempt skipped");
            record_outcome("skipped");
        }
        Err(e @ Error::NotAuthenticated(_)) => {
            warn!(error = %e, is_retry, "cannot post until authorization completes");
            record_outcome("failed");
        }
        Err(e) => {
            error!(error = %e, is_retry, retryable = e.is_retryable(), "attempt failed");
            record_outcome("failed");
        }
    }
}

/// Run one attempt, scheduling a single retry on a network-class failure.
///
/// Returns the retry handle when a retry was scheduled.
pub async fn attempt(job: &Arc<PostJob>, retry: &RetryTimer) -> Option<RetryHandle> {
    let result = job.run_once().await;
    log_result(&result, false);

    match result {
        Err(e) if e.is_retryable() => {
            warn!(
                delay_secs = retry.delay().as_secs(),
                "network failure, retrying once after delay"
            );
            record_outcome("retry_scheduled");
            let job = job.clone();
            Some(retry.schedule(async move {
                let result = job.run_once().await;
                log_result(&result, true);
            }))
        }
        _ => None,
    }
}

/// Spawn the periodic posting task.
///
/// The first attempt runs one full `interval` after start. Stops when
/// `shutdown` is cancelled; retries are cancelled through the same token.
pub fn spawn_post_task(
    job: Arc<PostJob>,
    interval: Duration,
    retry: RetryTimer,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick
        ticker.tick().await;

        info!(interval_secs = interval.as_secs(), "posting schedule started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    attempt(&job, &retry).await;
                }
            }
        }
        info!(pending_retries = retry.pending(), "posting schedule stopped");
    })
}
