//! Shared view of the current access token
//!
//! Caches the stored record and re-reads it when the file's modification
//! time changes, so a record rewritten or deleted out of band is picked up
//! on the next call. `ensure_authenticated` runs at most one authorization
//! at a time.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::flow::AuthFlow;
use crate::pin::PinSource;
use crate::token::AccessToken;

struct Cached {
    token: Option<AccessToken>,
    modified: Option<SystemTime>,
}

/// Access-token provider shared by the publisher and the auth front end.
pub struct Session {
    store: Arc<CredentialStore>,
    cached: Mutex<Option<Cached>>,
    auth_lock: Mutex<()>,
}

impl Session {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
            auth_lock: Mutex::new(()),
        }
    }

    /// The stored access token, or `None` when no complete record exists.
    pub async fn current(&self) -> Result<Option<AccessToken>> {
        let modified = self.store.modified().await;
        let mut cached = self.cached.lock().await;

        if let Some(c) = cached.as_ref()
            && c.modified == modified
            && modified.is_some()
        {
            return Ok(c.token.clone());
        }

        let token = self.store.load().await?;
        debug!(found = token.is_some(), "reloaded credential record");
        *cached = Some(Cached {
            token: token.clone(),
            modified,
        });
        Ok(token)
    }

    /// Return the stored token, running `flow` first if there is none.
    ///
    /// Concurrent callers wait for the in-progress authorization instead of
    /// starting their own.
    pub async fn ensure_authenticated(
        &self,
        flow: &AuthFlow,
        pin: &dyn PinSource,
    ) -> Result<AccessToken> {
        let _guard = self.auth_lock.lock().await;

        if let Some(token) = self.current().await? {
            info!(screen_name = ?token.screen_name, "using stored credentials");
            flow.mark_authenticated();
            return Ok(token);
        }

        let token = flow.run(pin).await?;
        self.invalidate().await;
        Ok(token)
    }

    /// Drop the cached record so the next `current` reads the file.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Endpoints;
    use crate::error::Error;
    use crate::signer::{ConsumerCredential, Signer};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token(tag: &str) -> AccessToken {
        AccessToken {
            oauth_token: format!("at_{tag}"),
            oauth_token_secret: format!("ats_{tag}"),
            user_id: None,
            screen_name: None,
        }
    }

    struct CountingPin(AtomicUsize);

    impl PinSource for CountingPin {
        fn request_pin<'a>(
            &'a self,
            _authorize_url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(Error::PinUnavailable("no operator".into())) })
        }
    }

    fn unreachable_flow(store: Arc<CredentialStore>) -> AuthFlow {
        // Port 9 (discard) on localhost is closed in test environments
        AuthFlow::new(
            reqwest::Client::new(),
            Signer::new(ConsumerCredential::new("ck", "cs")),
            Endpoints::with_base("http://127.0.0.1:9"),
            store,
        )
    }

    #[tokio::test]
    async fn current_is_none_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        let session = Session::new(store);
        assert_eq!(session.current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn current_sees_out_of_band_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = Arc::new(CredentialStore::new(path.clone()));
        let session = Session::new(store.clone());

        store.save(&token("a")).await.unwrap();
        assert_eq!(session.current().await.unwrap(), Some(token("a")));

        // Rewrite with a distinct mtime
        let mtime = SystemTime::now() + std::time::Duration::from_secs(10);
        store.save(&token("b")).await.unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        assert_eq!(session.current().await.unwrap(), Some(token("b")));

        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(session.current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_record_skips_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        store.save(&token("stored")).await.unwrap();
        let session = Session::new(store.clone());
        let flow = unreachable_flow(store);
        let pin = CountingPin(AtomicUsize::new(0));

        let got = session.ensure_authenticated(&flow, &pin).await.unwrap();

        assert_eq!(got, token("stored"));
        assert_eq!(pin.0.load(Ordering::SeqCst), 0);
        assert_eq!(flow.phase(), crate::flow::AuthPhase::Authenticated);
    }

    #[tokio::test]
    async fn missing_record_runs_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        let session = Session::new(store.clone());
        let flow = unreachable_flow(store);
        let pin = CountingPin(AtomicUsize::new(0));

        let err = session.ensure_authenticated(&flow, &pin).await.unwrap_err();

        assert!(matches!(err, Error::RequestToken(_)), "got: {err:?}");
        assert_eq!(session.current().await.unwrap(), None);
    }
}
