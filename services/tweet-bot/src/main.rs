//! Tweet Bot
//!
//! Single-binary Rust service that:
//! 1. Serves `GET /tweet`, generating one short post via the Gemini API
//! 2. Authorizes against Twitter with the OAuth 1.0a PIN flow (once; the
//!    access token is stored on disk)
//! 3. Every interval fetches a post from `/tweet` and publishes it with a
//!    " - AI Generated" suffix, retrying once on network failure

mod config;
mod error;
mod generate;
mod metrics;
mod pin;
mod routes;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use publisher::Publisher;
use scheduler::{HttpContentSource, PostJob, PublisherSink, RetryTimer, spawn_post_task};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitter_auth::{AccessToken, AuthFlow, CredentialStore, PinHandoff, Session, Signer};

use crate::config::{Config, PinEntry};
use crate::generate::Generator;
use crate::pin::ConsolePin;
use crate::routes::AppState;

/// How long in-flight HTTP requests may take to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before a failed web-entry handshake starts over
const AUTH_RESTART_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting tweet-bot");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        credentials_path = %config.twitter.credentials_path.display(),
        pin_entry = ?config.twitter.pin_entry,
        interval_secs = config.schedule.interval_secs,
        content_url = %config.schedule.content_url,
        generator_key = config.api_key.is_some(),
        "configuration loaded"
    );
    if config.api_key.is_none() {
        warn!("API_KEY is not set; /tweet will fail until it is provided");
    }

    let consumer = config
        .consumer
        .clone()
        .context("consumer credentials were not resolved")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let signer = Signer::new(consumer);
    let store = Arc::new(CredentialStore::new(config.twitter.credentials_path.clone()));
    let session = Arc::new(Session::new(store.clone()));
    let auth = Arc::new(AuthFlow::new(
        client.clone(),
        signer.clone(),
        config.twitter.endpoints(),
        store,
    ));
    let pin_handoff = Arc::new(PinHandoff::new());
    let generator = Arc::new(Generator::new(
        client.clone(),
        &config.generator,
        config.api_key.clone(),
    ));
    let publisher = Arc::new(Publisher::with_endpoint(
        client.clone(),
        signer,
        config.twitter.tweets_url.clone(),
    ));

    let shutdown = CancellationToken::new();

    // The server starts first: the schedule reads its content from /tweet and
    // web PIN entry goes through /auth/pin.
    let app_state = AppState {
        generator,
        auth: auth.clone(),
        pin: pin_handoff.clone(),
        prometheus: prometheus_handle,
        started_at: Instant::now(),
    };
    let app = routes::build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    let job = Arc::new(
        PostJob::new(
            Arc::new(HttpContentSource::new(
                client.clone(),
                config.schedule.content_url.clone(),
            )),
            Arc::new(PublisherSink::new(publisher, session.clone())),
        )
        .with_suffix(config.schedule.suffix.clone()),
    );
    let retry = RetryTimer::new(
        Duration::from_secs(config.schedule.retry_delay_secs),
        shutdown.clone(),
    );

    let auth_task = spawn_auth_then_schedule(
        session,
        auth,
        pin_handoff,
        config.twitter.pin_entry,
        job,
        Duration::from_secs(config.schedule.interval_secs),
        retry,
        shutdown.clone(),
    );

    // Wait for the OS signal
    shutdown_signal().await;

    // Stop the schedule, cancel pending retries, begin draining the server
    shutdown.cancel();

    // The drain timeout starts at signal receipt
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    match auth_task.await {
        Ok(Some(post_task)) => {
            if let Err(e) = post_task.await {
                error!(error = %e, "posting task panicked");
            }
        }
        Ok(None) => {
            // A console prompt may still be blocked reading stdin, which would
            // keep the runtime from shutting down
            warn!("shutdown while waiting for authorization");
            info!("shutdown complete");
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, "authorization task panicked");
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Authorize (unless a stored token exists), then start the posting schedule.
///
/// Resolves to `None` when shutdown arrives before authorization finishes.
/// A failed console authorization still starts the schedule: each tick then
/// logs that no credentials are stored, and a record written later is picked
/// up. Web entry keeps restarting the handshake until it succeeds.
#[allow(clippy::too_many_arguments)]
fn spawn_auth_then_schedule(
    session: Arc<Session>,
    auth: Arc<AuthFlow>,
    pin_handoff: Arc<PinHandoff>,
    pin_entry: PinEntry,
    job: Arc<PostJob>,
    interval: Duration,
    retry: RetryTimer,
    shutdown: CancellationToken,
) -> JoinHandle<Option<JoinHandle<()>>> {
    tokio::spawn(async move {
        let authorize = async {
            match pin_entry {
                PinEntry::Console => {
                    session
                        .ensure_authenticated(&auth, &ConsolePin::stdio())
                        .await
                }
                PinEntry::Web => {
                    info!("PIN entry via POST /auth/pin; see GET /auth/status for the URL");
                    Ok(authorize_via_web(&session, &auth, &pin_handoff, AUTH_RESTART_DELAY).await)
                }
            }
        };

        let result = tokio::select! {
            _ = shutdown.cancelled() => return None,
            result = authorize => result,
        };

        match result {
            Ok(token) => {
                info!(screen_name = ?token.screen_name, "twitter service ready");
            }
            Err(e) => {
                error!(error = %e, "authorization failed; posts will fail until credentials are stored");
            }
        }

        Some(spawn_post_task(job, interval, retry, shutdown))
    })
}

/// Run the handshake with PINs from POST /auth/pin, starting a fresh one
/// after `delay` whenever it fails, e.g. on a mistyped PIN.
async fn authorize_via_web(
    session: &Session,
    auth: &AuthFlow,
    handoff: &PinHandoff,
    delay: Duration,
) -> AccessToken {
    loop {
        match session.ensure_authenticated(auth, handoff).await {
            Ok(token) => return token,
            Err(e) => {
                warn!(
                    error = %e,
                    restart_in_secs = delay.as_secs(),
                    "authorization failed; a new handshake will start"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
