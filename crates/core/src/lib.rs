//! Core traits and types for the concierge
//!
//! This crate provides foundational types used across all other crates:
//! - Trait seams for model invocation, knowledge retrieval and the
//!   verification queue
//! - Prompt and invocation types
//! - Session attributes and bounded conversation history
//! - Verification jobs and verdicts
//! - Error types

pub mod conversation;
pub mod error;
pub mod llm_types;
pub mod session;
pub mod traits;
pub mod verification;

pub use conversation::{ConversationHistory, Turn};
pub use error::{Error, Result};
pub use llm_types::{GenerationParams, InvocationResult, PromptInput, PromptSegment, Role};
pub use session::{keys, SessionAttributes, SWITCH_OFF, SWITCH_ON};
pub use traits::{
    Evidence, KnowledgeRetriever, ModelInvoker, RetrieveRequest, Retrieval, SearchMode,
    SourceFilter, VerificationQueue, NO_INFORMATION, SOURCE_URI_KEY,
};
pub use verification::{Classification, HallucinationFlag, VerificationJob, VerificationResult};
