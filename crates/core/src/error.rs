//! Error types shared across crates

use thiserror::Error;

/// Result alias used by the core traits
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
///
/// Crate-specific errors (`LlmError`, `RagError`, ...) convert into this
/// type so trait objects can be mixed freely.
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
