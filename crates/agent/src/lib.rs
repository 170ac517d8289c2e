//! Retrieval-augmented answering and response verification
//!
//! Features:
//! - Per-family prompt template tables with guardrail blocks
//! - Randomized instruction tags and role-segmented prompts
//! - Conversational agent: generate, evaluate, compare, detect
//! - Turn orchestration with bounded history and brand-scoped retrieval
//! - Batch hallucination verification

pub mod agent;
pub mod brand;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod templates;
pub mod verdict;
pub mod verification;

pub use agent::{ConversationalAgent, GeneratedResponse, ResponseFlags};
pub use brand::{BrandDirectory, ANY_BRAND};
pub use orchestrator::{
    BrandSlot, OrchestratorConfig, TurnOrchestrator, TurnOutcome, TurnRequest, GENERIC_FAILURE,
};
pub use prompt::{
    delimiter_from_config, render, DelimiterStrategy, PlainDelimiter, PromptBuilder,
    RandomNumericDelimiter, UuidDelimiter,
};
pub use registry::{KnowledgeBase, Registry, RegistryBuilder};
pub use templates::{TemplateKind, TemplateTable};
pub use verdict::{parse_comparison, parse_detection, parse_evaluation, Verdict};
pub use verification::{
    BatchItemFailure, BatchRequest, BatchResponse, QueueRecord, VerificationOutcome,
    VerificationProcessor,
};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid verification job: {0}")]
    InvalidJob(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<concierge_core::Error> for AgentError {
    fn from(err: concierge_core::Error) -> Self {
        use concierge_core::Error;
        match err {
            Error::Llm(msg) => AgentError::Llm(msg),
            Error::Retrieval(msg) => AgentError::Retrieval(msg),
            Error::Config(msg) => AgentError::Configuration(msg),
            Error::Serialization(msg) => AgentError::Serialization(msg),
            other => AgentError::Internal(other.to_string()),
        }
    }
}

impl From<concierge_llm::LlmError> for AgentError {
    fn from(err: concierge_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<concierge_rag::RagError> for AgentError {
    fn from(err: concierge_rag::RagError) -> Self {
        AgentError::Retrieval(err.to_string())
    }
}

impl From<concierge_config::ConfigError> for AgentError {
    fn from(err: concierge_config::ConfigError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}

impl From<AgentError> for concierge_core::Error {
    fn from(err: AgentError) -> Self {
        concierge_core::Error::Agent(err.to_string())
    }
}
