//! Prometheus metrics exposition
//!
//! - `tweets_total` (counter): label `outcome`, recorded by the scheduler
//! - `generations_total` (counter): label `outcome` = `ok` | `error`
//! - `generation_duration_seconds` (histogram)

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const GENERATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `generation_duration_seconds` with explicit buckets so it
/// renders as a Prometheus histogram rather than a summary.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("generation_duration_seconds".to_string()),
            GENERATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record one call to the content generator.
pub fn record_generation(ok: bool, duration_secs: f64) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("generations_total", "outcome" => outcome).increment(1);
    metrics::histogram!("generation_duration_seconds").record(duration_secs);
}
