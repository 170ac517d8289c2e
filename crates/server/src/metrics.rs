//! Prometheus metrics
//!
//! Counters and histograms are recorded with the `metrics` macros where the
//! work happens; this module installs the exporter and serves the text
//! format.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global recorder
///
/// Returns `None` when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_metrics();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder not installed");
            None
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!("concierge_turns_total", "Answered dialog turns");
    metrics::describe_counter!("concierge_turn_failures_total", "Turns answered with the generic failure");
    metrics::describe_counter!("concierge_retrieval_failures_total", "Retrievals that failed open");
    metrics::describe_counter!("concierge_enqueue_failures_total", "Turns that could not be queued");
    metrics::describe_counter!(
        "concierge_verification_results_total",
        "Hallucination checks by classification"
    );
    metrics::describe_histogram!("concierge_model_latency_ms", "Answer generation latency");
    metrics::describe_histogram!("concierge_retrieval_latency_ms", "Knowledge base latency");
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled\n".to_string()),
    }
}
