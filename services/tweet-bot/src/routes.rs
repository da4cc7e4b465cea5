//! HTTP surface
//!
//! Endpoints:
//! - GET  /tweet        generate one cleaned post (the scheduler's content source)
//! - GET  /health       status, authentication phase, uptime
//! - GET  /metrics      Prometheus text exposition
//! - GET  /auth/status  current authorization phase
//! - POST /auth/pin     resume an authorization waiting for a PIN (web entry)

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{error, info, warn};
use twitter_auth::{AuthFlow, AuthPhase, PinHandoff};

use crate::generate::Generator;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    pub auth: Arc<AuthFlow>,
    pub pin: Arc<PinHandoff>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/tweet", get(tweet_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/auth/status", get(auth_status_handler))
        .route("/auth/pin", post(submit_pin_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn json_response(status: StatusCode, body: serde_json::Value) -> impl IntoResponse {
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// GET /tweet: `{success: true, response}` or 500 `{success: false, error}`.
async fn tweet_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let start = Instant::now();

    let result = state.generator.generate().await;
    crate::metrics::record_generation(result.is_ok(), start.elapsed().as_secs_f64());

    match result {
        Ok(text) => {
            info!(request_id, chars = text.chars().count(), "generated post");
            json_response(
                StatusCode::OK,
                serde_json::json!({ "success": true, "response": text }),
            )
        }
        Err(e) => {
            error!(request_id, error = %e, "error generating post");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "success": false, "error": e.to_string() }),
            )
        }
    }
}

/// GET /health: 200 once authenticated, 503 while authorization is pending
/// or failed.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();
    let phase = state.auth.phase();
    let (status_code, status) = match phase {
        AuthPhase::Authenticated => (StatusCode::OK, "healthy"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    json_response(
        status_code,
        serde_json::json!({
            "status": status,
            "authentication": phase,
            "uptime_seconds": uptime,
        }),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// GET /auth/status: the authorization phase, including the URL to visit
/// while a PIN is awaited.
async fn auth_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    json_response(StatusCode::OK, serde_json::json!(state.auth.phase()))
}

/// Request body for the PIN endpoint.
#[derive(Deserialize)]
struct SubmitPinRequest {
    pin: String,
}

/// POST /auth/pin: 202 when a flow was waiting, 409 when none is, 400 for a
/// blank PIN.
async fn submit_pin_handler(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<SubmitPinRequest>,
) -> impl IntoResponse {
    let pin = body.pin.trim();
    if pin.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": "pin must not be empty" }),
        );
    }

    match state.pin.submit(pin.to_string()).await {
        Ok(()) => {
            info!("PIN accepted, exchanging for access token");
            json_response(StatusCode::ACCEPTED, serde_json::json!({ "accepted": true }))
        }
        Err(e) => {
            warn!(error = %e, "PIN submitted with no authorization waiting");
            json_response(
                StatusCode::CONFLICT,
                serde_json::json!({ "error": e.to_string() }),
            )
        }
    }
}
