//! Model invocation for the managed inference runtime
//!
//! Features:
//! - One request/response format per provider family
//! - A single `ModelInvoker` adapter over a shared HTTP client
//! - Role decoding for flat prompts sent to chat-style providers
//! - Soft-failure normalization of empty predictions

pub mod adapter;
pub mod client;
pub mod factory;
pub mod providers;
pub mod roles;

pub use adapter::{normalize_prediction, ProviderAdapter};
pub use client::{InvokeClient, InvokeClientConfig, RawInvocation};
pub use factory::LlmFactory;
pub use providers::ProviderFormat;
pub use roles::{decode_roles, segments_of};

use thiserror::Error;

/// Error marker set when a model returns no usable prediction
pub const NO_PREDICTION_ERROR: &str = "no prediction returned";

/// Prediction substituted when a model returns nothing usable
pub const NO_PREDICTION_TEXT: &str = "no response from model";

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidRequest(err.to_string())
    }
}

impl From<LlmError> for concierge_core::Error {
    fn from(err: LlmError) -> Self {
        concierge_core::Error::Llm(err.to_string())
    }
}
