//! HTTP Endpoints
//!
//! - `POST /dialog/turn`: dialog platform fulfillment
//! - `POST /verification/batch`: queued hallucination checks
//! - `GET /health`, `GET /ready`, `GET /metrics`

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use concierge_agent::{BatchRequest, BatchResponse};

use crate::dialog::{DialogEvent, DialogResponse};
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

const FALLBACK_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/dialog/turn", post(dialog_turn))
        .route("/verification/batch", post(verification_batch))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer
/// - If no configured origin parses, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", FALLBACK_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(FALLBACK_ORIGIN))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Dialog turn
///
/// Turn failures are answered in the response body; the status stays 200 so
/// the platform can speak the apology.
async fn dialog_turn(
    State(state): State<AppState>,
    payload: Result<Json<DialogEvent>, JsonRejection>,
) -> Result<Json<DialogResponse>, ServerError> {
    let Json(event) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    Ok(Json(state.dispatcher.dispatch(event).await))
}

/// Verification batch
async fn verification_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ServerError> {
    let Json(batch) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| ServerError::Unavailable("no verification model".to_string()))?;

    tracing::info!(records = batch.records.len(), "Verification batch received");
    Ok(Json(verifier.process_batch(batch.records).await))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once the default model and knowledge base resolve
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let model_ok = state.registry.default_agent().is_some();
    let knowledge_base_ok = state.registry.default_knowledge_base().is_some();
    let ready = model_ok && knowledge_base_ok;

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "default_model": if model_ok { "ok" } else { "missing" },
                "default_knowledge_base": if knowledge_base_ok { "ok" } else { "missing" },
                "verification": if state.verifier.is_some() { "ok" } else { "disabled" },
            }
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_config::Settings;

    #[test]
    fn test_router_creation() {
        let mut settings = Settings::default();
        settings.queue.kind = concierge_config::QueueKind::Disabled;
        let state = AppState::from_settings(settings).unwrap();
        let _ = create_router(state);
    }

    #[test]
    fn test_cors_layers() {
        let _ = build_cors_layer(&[], true);
        let _ = build_cors_layer(&["not a header\n".to_string()], true);
        let _ = build_cors_layer(&["https://example.com".to_string()], true);
        let _ = build_cors_layer(&[], false);
    }
}
