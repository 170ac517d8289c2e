//! Concierge Server
//!
//! HTTP endpoints for dialog turns, batch verification, health and metrics.

pub mod dialog;
pub mod http;
pub mod metrics;
pub mod queue;
pub mod state;

pub use dialog::{DialogDispatcher, DialogEvent, DialogResponse, Route};
pub use http::create_router;
pub use metrics::init_metrics;
pub use queue::{build_queue, HttpQueue, LocalQueue};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Verification unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<concierge_agent::AgentError> for ServerError {
    fn from(err: concierge_agent::AgentError) -> Self {
        match err {
            concierge_agent::AgentError::Configuration(msg) => ServerError::Configuration(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<concierge_config::ConfigError> for ServerError {
    fn from(err: concierge_config::ConfigError) -> Self {
        ServerError::Configuration(err.to_string())
    }
}

impl From<ServerError> for concierge_core::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(msg) => concierge_core::Error::InvalidInput(msg),
            ServerError::Configuration(msg) => concierge_core::Error::Config(msg),
            other => concierge_core::Error::Agent(other.to_string()),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = StatusCode::from(self);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
