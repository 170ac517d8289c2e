//! Centralized constants for the concierge
//!
//! Default values shared by settings, registry construction and tests.

/// Service endpoints
pub mod endpoints {
    /// Managed inference runtime
    pub const INFERENCE_DEFAULT: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";

    /// Managed knowledge-base runtime
    pub const RETRIEVAL_DEFAULT: &str = "https://bedrock-agent-runtime.us-east-1.amazonaws.com";
}

/// Timeouts
pub mod timeouts {
    /// Model invocation timeout (ms)
    pub const INFERENCE_MS: u64 = 60_000;

    /// Knowledge-base query timeout (ms)
    pub const RETRIEVAL_MS: u64 = 10_000;

    /// HTTP request timeout for inbound requests (seconds)
    pub const REQUEST_SECS: u64 = 90;
}

/// Conversation handling
pub mod conversation {
    /// Turns kept in session history
    pub const MAX_TURNS: usize = 4;

    /// Trailing transcript characters sent as the retrieval query
    pub const QUERY_MAX_CHARS: usize = 500;

    /// Alias resolving to the configured default model or knowledge base
    pub const DEFAULT_ALIAS: &str = "Default";
}

/// Knowledge base defaults
pub mod retrieval {
    pub const MAX_RESULTS: usize = 5;

    /// Minimum relevance score for a passage to be used as evidence
    pub const SCORE_THRESHOLD: f32 = 0.40;

    pub const DEFAULT_KNOWLEDGE_BASE: &str = "Alfa";
}

/// Generation defaults applied to every registered model
pub mod generation {
    pub const TEMPERATURE: f32 = 0.0;
    pub const MAX_TOKENS: u32 = 1000;

    pub const DEFAULT_MODEL: &str = "Claude V3 Haiku";
}

/// Verification queue
pub mod queue {
    /// Local channel capacity
    pub const CAPACITY: usize = 1024;

    /// Verification jobs processed concurrently per batch
    pub const CONCURRENCY: usize = 4;
}

/// Instruction tag randomization
pub mod delimiter {
    pub const PREFIX: &str = "random";
    pub const MIN: u32 = 10_000;
    pub const MAX: u32 = 99_999;
}
