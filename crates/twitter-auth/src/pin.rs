//! PIN entry: the point where the authorization flow waits for a human
//!
//! The flow hands the authorization URL to a `PinSource` and suspends until
//! the source yields the PIN the user copied from the browser. There is no
//! timeout; cancellation comes from outside (dropping the flow future or
//! terminating the process).

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{Mutex, oneshot};
use tracing::info;

use crate::error::{Error, Result};

/// Supplier of the out-of-band PIN.
///
/// Uses `Pin<Box<dyn Future>>` so sources can be passed as `&dyn PinSource`.
pub trait PinSource: Send + Sync {
    /// Present `authorize_url` to the operator and resolve with the PIN.
    fn request_pin<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// PIN source resumed from another task, e.g. an HTTP form handler.
///
/// `request_pin` parks a oneshot sender; `submit` completes it. Only one
/// prompt can be outstanding; a new prompt replaces a stale one, whose
/// waiter then fails with `PinUnavailable`.
#[derive(Default)]
pub struct PinHandoff {
    pending: Mutex<Option<oneshot::Sender<String>>>,
}

impl PinHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a flow is currently suspended waiting for a PIN.
    pub async fn is_waiting(&self) -> bool {
        self.pending
            .lock()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Resume the waiting flow with `pin`.
    pub async fn submit(&self, pin: String) -> Result<()> {
        let sender = self.pending.lock().await.take().ok_or(Error::NoPendingPin)?;
        sender.send(pin).map_err(|_| Error::NoPendingPin)
    }
}

impl PinSource for PinHandoff {
    fn request_pin<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            *self.pending.lock().await = Some(tx);
            info!(authorize_url, "waiting for PIN submission");
            rx.await
                .map_err(|_| Error::PinUnavailable("PIN prompt was abandoned".into()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn submit_without_prompt_fails() {
        let handoff = PinHandoff::new();
        assert!(!handoff.is_waiting().await);
        let err = handoff.submit("123".into()).await.unwrap_err();
        assert!(matches!(err, Error::NoPendingPin));
    }

    #[tokio::test]
    async fn submit_resumes_waiting_prompt() {
        let handoff = Arc::new(PinHandoff::new());
        let waiter = {
            let handoff = handoff.clone();
            tokio::spawn(async move { handoff.request_pin("https://auth.example/x").await })
        };

        while !handoff.is_waiting().await {
            tokio::task::yield_now().await;
        }
        handoff.submit("9876543".into()).await.unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), "9876543");
        assert!(!handoff.is_waiting().await);
    }

    #[tokio::test]
    async fn replaced_prompt_reports_unavailable() {
        let handoff = Arc::new(PinHandoff::new());
        let first = {
            let handoff = handoff.clone();
            tokio::spawn(async move { handoff.request_pin("first").await })
        };
        while !handoff.is_waiting().await {
            tokio::task::yield_now().await;
        }

        let second = {
            let handoff = handoff.clone();
            tokio::spawn(async move { handoff.request_pin("second").await })
        };

        let err = first.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::PinUnavailable(_)));

        while !handoff.is_waiting().await {
            tokio::task::yield_now().await;
        }
        handoff.submit("42".into()).await.unwrap();
        assert_eq!(second.await.unwrap().unwrap(), "42");
    }
}
