//! Knowledge-base retrieval
//!
//! Features:
//! - Managed knowledge-base client (semantic or hybrid search)
//! - Brand-scoped source filters
//! - Score-threshold evidence assembly with a no-information sentinel
//! - Trailing-window query truncation on character boundaries

pub mod evidence;
pub mod managed;
pub mod query;

pub use evidence::{assemble_evidence, ScoredPassage};
pub use managed::{ManagedRetriever, ManagedRetrieverConfig};
pub use query::{trailing_window, MAX_QUERY_CHARS};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RagError::Timeout
        } else {
            RagError::Connection(err.to_string())
        }
    }
}

impl From<RagError> for concierge_core::Error {
    fn from(err: RagError) -> Self {
        concierge_core::Error::Retrieval(err.to_string())
    }
}
