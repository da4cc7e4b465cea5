//! Three-legged OAuth 1.0a PIN authorization
//!
//! Pure state machine: `handle_event` receives events and returns
//! (new_state, action). `AuthFlow::run` executes the I/O implied by each
//! action and feeds the result back as the next event.
//!
//! ```text
//! Idle -> RequestingToken -> AwaitingUserPin -> ExchangingToken -> Authenticated
//!              |                   |                  |
//!              +-------------------+------------------+--> Failed
//! ```
//!
//! The access token is saved before the flow reports `Authenticated`; a failed
//! save ends in `Failed`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

use crate::constants::Endpoints;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::pin::PinSource;
use crate::signer::Signer;
use crate::token::{self, AccessToken, RequestToken};

/// Authorization states.
#[derive(Debug)]
pub enum AuthState {
    Idle,
    RequestingToken,
    /// Suspended until a PIN arrives through a `PinSource`
    AwaitingUserPin {
        request_token: RequestToken,
        authorize_url: String,
    },
    ExchangingToken,
    /// Terminal: token obtained and stored
    Authenticated(AccessToken),
    /// Terminal: any leg failed
    Failed { reason: String },
}

/// Events that drive state transitions.
#[derive(Debug)]
pub enum AuthEvent {
    Start,
    RequestTokenIssued {
        request_token: RequestToken,
        authorize_url: String,
    },
    PinEntered(String),
    AccessTokenIssued(AccessToken),
    CredentialsSaved(AccessToken),
    /// Any leg failed; carries the error to surface
    StepFailed(Error),
}

/// Actions the driver should execute after a transition.
#[derive(Debug)]
pub enum AuthAction {
    FetchRequestToken,
    PromptForPin {
        authorize_url: String,
    },
    ExchangePin {
        request_token: RequestToken,
        pin: String,
    },
    SaveCredentials(AccessToken),
    Complete(AccessToken),
    Abort(Error),
    None,
}

/// Serializable snapshot of the flow for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthPhase {
    Idle,
    RequestingToken,
    AwaitingUserPin { authorize_url: String },
    ExchangingToken,
    Authenticated,
    Failed { reason: String },
}

impl From<&AuthState> for AuthPhase {
    fn from(state: &AuthState) -> Self {
        match state {
            AuthState::Idle => AuthPhase::Idle,
            AuthState::RequestingToken => AuthPhase::RequestingToken,
            AuthState::AwaitingUserPin { authorize_url, .. } => AuthPhase::AwaitingUserPin {
                authorize_url: authorize_url.clone(),
            },
            AuthState::ExchangingToken => AuthPhase::ExchangingToken,
            AuthState::Authenticated(_) => AuthPhase::Authenticated,
            AuthState::Failed { reason } => AuthPhase::Failed {
                reason: reason.clone(),
            },
        }
    }
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: AuthState, event: AuthEvent) -> (AuthState, AuthAction) {
    match (state, event) {
        (AuthState::Idle, AuthEvent::Start) => {
            (AuthState::RequestingToken, AuthAction::FetchRequestToken)
        }

        (
            AuthState::RequestingToken,
            AuthEvent::RequestTokenIssued {
                request_token,
                authorize_url,
            },
        ) => (
            AuthState::AwaitingUserPin {
                request_token,
                authorize_url: authorize_url.clone(),
            },
            AuthAction::PromptForPin { authorize_url },
        ),

        (AuthState::AwaitingUserPin { request_token, .. }, AuthEvent::PinEntered(pin)) => {
            let pin = pin.trim().to_string();
            if pin.is_empty() {
                let err = Error::PinUnavailable("empty PIN".into());
                return (
                    AuthState::Failed {
                        reason: err.to_string(),
                    },
                    AuthAction::Abort(err),
                );
            }
            (
                AuthState::ExchangingToken,
                AuthAction::ExchangePin { request_token, pin },
            )
        }

        (AuthState::ExchangingToken, AuthEvent::AccessTokenIssued(token)) => {
            (AuthState::ExchangingToken, AuthAction::SaveCredentials(token))
        }

        (AuthState::ExchangingToken, AuthEvent::CredentialsSaved(token)) => (
            AuthState::Authenticated(token.clone()),
            AuthAction::Complete(token),
        ),

        // --- Any in-progress state + failure = Failed ---
        (
            AuthState::RequestingToken
            | AuthState::AwaitingUserPin { .. }
            | AuthState::ExchangingToken,
            AuthEvent::StepFailed(err),
        ) => (
            AuthState::Failed {
                reason: err.to_string(),
            },
            AuthAction::Abort(err),
        ),

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, AuthAction::None),
    }
}

/// Drives one authorization attempt against the token endpoints.
pub struct AuthFlow {
    client: reqwest::Client,
    signer: Signer,
    endpoints: Endpoints,
    store: Arc<CredentialStore>,
    phase: watch::Sender<AuthPhase>,
}

impl AuthFlow {
    pub fn new(
        client: reqwest::Client,
        signer: Signer,
        endpoints: Endpoints,
        store: Arc<CredentialStore>,
    ) -> Self {
        let (phase, _) = watch::channel(AuthPhase::Idle);
        Self {
            client,
            signer,
            endpoints,
            store,
            phase,
        }
    }

    /// Observe phase changes (e.g. to show the authorization URL on a page).
    pub fn subscribe(&self) -> watch::Receiver<AuthPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase.borrow().clone()
    }

    /// Mark the phase as authenticated without running the handshake, used
    /// when a stored credential was found.
    pub fn mark_authenticated(&self) {
        self.phase.send_replace(AuthPhase::Authenticated);
    }

    /// Run the handshake to completion, suspending on `pin` for user input.
    ///
    /// Each call creates a new, independent access token.
    pub async fn run(&self, pin: &dyn PinSource) -> Result<AccessToken> {
        info!("starting authorization");
        let mut state = AuthState::Idle;
        let mut event = AuthEvent::Start;

        loop {
            let (next, action) = handle_event(state, event);
            state = next;
            self.phase.send_replace(AuthPhase::from(&state));

            event = match action {
                AuthAction::FetchRequestToken => {
                    match token::request_token(&self.client, &self.signer, &self.endpoints).await {
                        Ok(request_token) => {
                            let authorize_url =
                                token::authorize_url(&self.endpoints, &request_token);
                            AuthEvent::RequestTokenIssued {
                                request_token,
                                authorize_url,
                            }
                        }
                        Err(e) => AuthEvent::StepFailed(e),
                    }
                }
                AuthAction::PromptForPin { authorize_url } => {
                    info!(authorize_url, "authorize the application and enter the PIN");
                    match pin.request_pin(&authorize_url).await {
                        Ok(p) => AuthEvent::PinEntered(p),
                        Err(e) => AuthEvent::StepFailed(e),
                    }
                }
                AuthAction::ExchangePin { request_token, pin } => {
                    match token::access_token(
                        &self.client,
                        &self.signer,
                        &self.endpoints,
                        &request_token,
                        &pin,
                    )
                    .await
                    {
                        Ok(access) => AuthEvent::AccessTokenIssued(access),
                        Err(e) => AuthEvent::StepFailed(e),
                    }
                }
                AuthAction::SaveCredentials(access) => match self.store.save(&access).await {
                    Ok(()) => AuthEvent::CredentialsSaved(access),
                    Err(e) => AuthEvent::StepFailed(e),
                },
                AuthAction::Complete(access) => {
                    info!(screen_name = ?access.screen_name, "authentication completed and tokens stored");
                    return Ok(access);
                }
                AuthAction::Abort(e) => {
                    error!(error = %e, "authorization failed");
                    return Err(e);
                }
                AuthAction::None => {
                    return Err(Error::Stalled(format!("{state:?}")));
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::ConsumerCredential;
    use axum::Router;
    use axum::http::{StatusCode, Uri};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    fn request_token() -> RequestToken {
        RequestToken {
            oauth_token: "rt".into(),
            oauth_token_secret: "rts".into(),
            oauth_callback_confirmed: true,
        }
    }

    fn access_token() -> AccessToken {
        AccessToken {
            oauth_token: "at".into(),
            oauth_token_secret: "ats".into(),
            user_id: Some("7".into()),
            screen_name: Some("bot".into()),
        }
    }

    /// PIN source that answers immediately and records the URL it was shown.
    struct FixedPin {
        pin: &'static str,
        shown: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl FixedPin {
        fn new(pin: &'static str) -> Self {
            Self {
                pin,
                shown: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PinSource for FixedPin {
        fn request_pin<'a>(
            &'a self,
            authorize_url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.shown.lock().unwrap().push(authorize_url.to_string());
            let pin = self.pin.to_string();
            Box::pin(async move { Ok(pin) })
        }
    }

    /// Mock OAuth server: request_token and access_token paths answer with
    /// the given bodies (status 200).
    async fn start_oauth_server(request_body: &'static str, access_body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new().fallback(move |uri: Uri| async move {
            if uri.path() == "/oauth/request_token" {
                (StatusCode::OK, request_body)
            } else if uri.path() == "/oauth/access_token" {
                (StatusCode::OK, access_body)
            } else {
                (StatusCode::NOT_FOUND, "")
            }
        });
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        base
    }

    fn flow_for(base: &str, store: Arc<CredentialStore>) -> AuthFlow {
        AuthFlow::new(
            reqwest::Client::new(),
            Signer::new(ConsumerCredential::new("ck", "cs")),
            Endpoints::with_base(base),
            store,
        )
    }

    #[test]
    fn idle_start_requests_token() {
        let (state, action) = handle_event(AuthState::Idle, AuthEvent::Start);
        assert!(matches!(state, AuthState::RequestingToken));
        assert!(matches!(action, AuthAction::FetchRequestToken));
    }

    #[test]
    fn request_token_moves_to_awaiting_pin() {
        let (state, action) = handle_event(
            AuthState::RequestingToken,
            AuthEvent::RequestTokenIssued {
                request_token: request_token(),
                authorize_url: "https://auth/x?oauth_token=rt".into(),
            },
        );
        assert!(matches!(state, AuthState::AwaitingUserPin { .. }));
        assert!(
            matches!(action, AuthAction::PromptForPin { ref authorize_url } if authorize_url == "https://auth/x?oauth_token=rt")
        );
    }

    #[test]
    fn pin_is_trimmed_before_exchange() {
        let (state, action) = handle_event(
            AuthState::AwaitingUserPin {
                request_token: request_token(),
                authorize_url: String::new(),
            },
            AuthEvent::PinEntered(" 1234567\n".into()),
        );
        assert!(matches!(state, AuthState::ExchangingToken));
        assert!(matches!(action, AuthAction::ExchangePin { ref pin, .. } if pin == "1234567"));
    }

    #[test]
    fn empty_pin_fails() {
        let (state, action) = handle_event(
            AuthState::AwaitingUserPin {
                request_token: request_token(),
                authorize_url: String::new(),
            },
            AuthEvent::PinEntered("  \n".into()),
        );
        assert!(matches!(state, AuthState::Failed { .. }));
        assert!(matches!(action, AuthAction::Abort(Error::PinUnavailable(_))));
    }

    #[test]
    fn access_token_is_saved_before_authenticated() {
        let (state, action) = handle_event(
            AuthState::ExchangingToken,
            AuthEvent::AccessTokenIssued(access_token()),
        );
        assert!(matches!(state, AuthState::ExchangingToken));
        assert!(matches!(action, AuthAction::SaveCredentials(_)));

        let (state, action) =
            handle_event(state, AuthEvent::CredentialsSaved(access_token()));
        assert!(matches!(state, AuthState::Authenticated(_)));
        assert!(matches!(action, AuthAction::Complete(t) if t == access_token()));
    }

    #[test]
    fn failure_in_any_leg_is_terminal() {
        for state in [
            AuthState::RequestingToken,
            AuthState::AwaitingUserPin {
                request_token: request_token(),
                authorize_url: String::new(),
            },
            AuthState::ExchangingToken,
        ] {
            let (state, action) = handle_event(
                state,
                AuthEvent::StepFailed(Error::RequestToken("connection refused".into())),
            );
            assert!(matches!(state, AuthState::Failed { ref reason } if reason.contains("connection refused")));
            assert!(matches!(action, AuthAction::Abort(_)));
        }
    }

    #[test]
    fn terminal_states_ignore_events() {
        let (state, action) = handle_event(
            AuthState::Failed {
                reason: "x".into(),
            },
            AuthEvent::Start,
        );
        assert!(matches!(state, AuthState::Failed { .. }));
        assert!(matches!(action, AuthAction::None));
    }

    #[test]
    fn phase_serializes_with_state_tag() {
        let phase = AuthPhase::AwaitingUserPin {
            authorize_url: "https://auth/x".into(),
        };
        let json = serde_json::to_value(&phase).unwrap();
        assert_eq!(json["state"], "awaiting_user_pin");
        assert_eq!(json["authorize_url"], "https://auth/x");
    }

    #[tokio::test]
    async fn successful_flow_persists_token() {
        let base = start_oauth_server(
            "oauth_token=rt&oauth_token_secret=rts&oauth_callback_confirmed=true",
            "oauth_token=at&oauth_token_secret=ats&user_id=7&screen_name=bot",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        let flow = flow_for(&base, store.clone());
        let pin = FixedPin::new("1234567");

        let token = flow.run(&pin).await.unwrap();

        assert_eq!(token, access_token());
        assert_eq!(store.load().await.unwrap(), Some(token));
        assert_eq!(flow.phase(), AuthPhase::Authenticated);
        assert_eq!(
            pin.shown.lock().unwrap().as_slice(),
            [format!("{base}/oauth/authorize?oauth_token=rt")]
        );
    }

    #[tokio::test]
    async fn missing_oauth_token_fails_without_saving() {
        let base = start_oauth_server(
            "oauth_token_secret=rts&oauth_callback_confirmed=true",
            "oauth_token=at&oauth_token_secret=ats",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = Arc::new(CredentialStore::new(path.clone()));
        let flow = flow_for(&base, store.clone());
        let pin = FixedPin::new("1234567");

        let err = flow.run(&pin).await.unwrap_err();

        assert!(matches!(err, Error::RequestToken(_)), "got: {err:?}");
        assert!(!path.exists(), "save must not be called");
        assert_eq!(pin.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(flow.phase(), AuthPhase::Failed { .. }));
    }

    #[tokio::test]
    async fn access_token_failure_is_reported() {
        let base = start_oauth_server(
            "oauth_token=rt&oauth_token_secret=rts",
            "oauth_problem=token_rejected",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        let flow = flow_for(&base, store.clone());

        let err = flow.run(&FixedPin::new("1")).await.unwrap_err();

        assert!(matches!(err, Error::AccessToken(_)), "got: {err:?}");
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_failure_is_not_success() {
        let base = start_oauth_server(
            "oauth_token=rt&oauth_token_secret=rts",
            "oauth_token=at&oauth_token_secret=ats",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(
            dir.path().join("missing-dir").join("tokens.json"),
        ));
        let flow = flow_for(&base, store);

        let err = flow.run(&FixedPin::new("1")).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)), "got: {err:?}");
        assert!(matches!(flow.phase(), AuthPhase::Failed { .. }));
    }

    #[tokio::test]
    async fn subscribers_see_awaiting_pin() {
        let base = start_oauth_server(
            "oauth_token=rt&oauth_token_secret=rts",
            "oauth_token=at&oauth_token_secret=ats",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().join("tokens.json")));
        let flow = Arc::new(flow_for(&base, store));
        let handoff = Arc::new(crate::pin::PinHandoff::new());
        let mut phases = flow.subscribe();

        let task = {
            let flow = flow.clone();
            let handoff = handoff.clone();
            tokio::spawn(async move { flow.run(handoff.as_ref()).await })
        };

        let url = loop {
            phases.changed().await.unwrap();
            if let AuthPhase::AwaitingUserPin { authorize_url } = phases.borrow().clone() {
                break authorize_url;
            }
        };
        assert!(url.ends_with("oauth_token=rt"));

        while !handoff.is_waiting().await {
            tokio::task::yield_now().await;
        }
        handoff.submit("4242".into()).await.unwrap();

        assert_eq!(task.await.unwrap().unwrap().oauth_token, "at");
    }
}
