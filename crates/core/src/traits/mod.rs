//! Core traits for the concierge
//!
//! Every external dependency of a turn sits behind one of these traits so
//! backends can be swapped by configuration and mocked in tests.
//!
//! ```text
//! Language Models:
//!   - ModelInvoker: one prompt in, one normalized prediction out
//!
//! Retrieval:
//!   - KnowledgeRetriever: query a managed knowledge base
//!
//! Verification:
//!   - VerificationQueue: hand answered turns to the offline verifier
//! ```

mod llm;
mod queue;
mod retriever;

pub use llm::ModelInvoker;
pub use queue::VerificationQueue;
pub use retriever::{
    Evidence, KnowledgeRetriever, RetrieveRequest, Retrieval, SearchMode, SourceFilter,
    NO_INFORMATION, SOURCE_URI_KEY,
};
