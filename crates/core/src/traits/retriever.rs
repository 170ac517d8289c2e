//! Retrieval traits for RAG

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence text used when retrieval produced nothing usable
pub const NO_INFORMATION: &str = "There is no information available on this topic.";

/// Knowledge base query interface
///
/// Implementations:
/// - `ManagedRetriever` - managed vector/hybrid knowledge base over HTTP
///
/// # Example
///
/// ```ignore
/// let request = RetrieveRequest::new(query).with_max_results(5).with_min_score(0.4);
/// let retrieval = retriever.retrieve(&request).await?;
/// println!("{}", retrieval.evidence.prompt_text());
/// ```
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync + 'static {
    /// Query the knowledge base and assemble evidence
    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Retrieval>;

    /// Provider-side knowledge base identifier
    fn knowledge_base_id(&self) -> &str;

    /// Storage bucket the knowledge base was ingested from, if brand
    /// filtering is supported
    fn source_bucket(&self) -> Option<&str> {
        None
    }

    /// Retriever name for logging
    fn name(&self) -> &str;
}

/// Search strategy requested from the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    Semantic,
    #[default]
    Hybrid,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Semantic => write!(f, "SEMANTIC"),
            SearchMode::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// Metadata filter restricting which documents may match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    /// Metadata value at `key` must start with `value`
    StartsWith { key: String, value: String },
}

/// Metadata key holding a document's source location
pub const SOURCE_URI_KEY: &str = "x-amz-bedrock-kb-source-uri";

impl SourceFilter {
    /// Restrict to documents stored under a brand prefix in a bucket
    pub fn brand_prefix(bucket: &str, prefix: &str) -> Self {
        SourceFilter::StartsWith {
            key: SOURCE_URI_KEY.to_string(),
            value: format!("s3://{}{}", bucket, prefix),
        }
    }
}

/// Retrieval options
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveRequest {
    pub query: String,
    /// Number of results requested from the knowledge base
    pub max_results: usize,
    /// Minimum score a result needs to be used as evidence
    pub min_score: f32,
    pub search_mode: SearchMode,
    pub filter: Option<SourceFilter>,
}

impl RetrieveRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 5,
            min_score: 0.4,
            search_mode: SearchMode::Hybrid,
            filter: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: SourceFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Evidence assembled from accepted passages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Accepted passages, each followed by a newline
    Passages(String),
    /// Nothing passed the threshold
    None,
}

impl Evidence {
    /// Text substituted into the prompt
    pub fn prompt_text(&self) -> &str {
        match self {
            Evidence::Passages(text) => text,
            Evidence::None => NO_INFORMATION,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Evidence::None)
    }
}

/// Outcome of one retrieval
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub evidence: Evidence,
    /// Results that passed the threshold
    pub accepted: usize,
    pub latency_ms: u64,
}

impl Retrieval {
    /// Retrieval that found nothing
    pub fn empty(latency_ms: u64) -> Self {
        Self {
            evidence: Evidence::None,
            accepted: 0,
            latency_ms,
        }
    }
}
