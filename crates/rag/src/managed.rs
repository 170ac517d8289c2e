//! Managed knowledge-base retriever
//!
//! Queries `POST {endpoint}/knowledgebases/{id}/retrieve` and turns the
//! ranked results into evidence text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use concierge_config::{KnowledgeBaseDescriptor, RetrievalConfig};
use concierge_core::{
    KnowledgeRetriever, RetrieveRequest, Retrieval, SearchMode, SourceFilter, SOURCE_URI_KEY,
};

use crate::evidence::{assemble_evidence, ScoredPassage};
use crate::query::{trailing_window, MAX_QUERY_CHARS};
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct ManagedRetrieverConfig {
    /// Logical name used in sessions and logs
    pub name: String,
    pub knowledge_base_id: String,
    pub endpoint: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    /// Defaults for requests built by [`ManagedRetriever::request`]
    pub max_results: usize,
    pub score_threshold: f32,
    pub search_mode: SearchMode,
    pub source_bucket: Option<String>,
}

impl ManagedRetrieverConfig {
    pub fn from_descriptor(descriptor: &KnowledgeBaseDescriptor, retrieval: &RetrievalConfig) -> Self {
        Self {
            name: descriptor.name.clone(),
            knowledge_base_id: descriptor.knowledge_base_id.clone(),
            endpoint: retrieval.endpoint.clone(),
            bearer_token: retrieval.bearer_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_millis(retrieval.timeout_ms),
            max_results: descriptor.max_results,
            score_threshold: descriptor.score_threshold,
            search_mode: descriptor.search_mode,
            source_bucket: descriptor.source_bucket.clone().filter(|b| !b.is_empty()),
        }
    }
}

/// Knowledge base reached over HTTP
pub struct ManagedRetriever {
    config: ManagedRetrieverConfig,
    client: Client,
}

impl ManagedRetriever {
    pub fn new(config: ManagedRetrieverConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        Self::with_client(config, client)
    }

    /// Share an existing HTTP client
    pub fn with_client(config: ManagedRetrieverConfig, client: Client) -> Result<Self, RagError> {
        if config.knowledge_base_id.trim().is_empty() {
            return Err(RagError::Configuration(format!(
                "knowledge base '{}' has no id",
                config.name
            )));
        }
        if config.endpoint.trim().is_empty() {
            return Err(RagError::Configuration(
                "retrieval endpoint not set".to_string(),
            ));
        }
        Ok(Self { config, client })
    }

    /// Request prefilled with this knowledge base's defaults
    pub fn request(&self, query: impl Into<String>) -> RetrieveRequest {
        RetrieveRequest::new(query)
            .with_max_results(self.config.max_results)
            .with_min_score(self.config.score_threshold)
            .with_search_mode(self.config.search_mode)
    }

    pub fn retrieve_url(&self) -> String {
        format!(
            "{}/knowledgebases/{}/retrieve",
            self.config.endpoint.trim_end_matches('/'),
            self.config.knowledge_base_id
        )
    }

    /// Query the knowledge base for ranked passages
    pub async fn search(&self, request: &RetrieveRequest) -> Result<Vec<ScoredPassage>, RagError> {
        let body = build_request_body(request);

        let mut http = self.client.post(self.retrieve_url()).json(&body);
        if let Some(token) = &self.config.bearer_token {
            http = http.bearer_auth(token);
        }

        let response = http.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Search(format!("HTTP {}: {}", status, error_text)));
        }

        let response: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| RagError::InvalidResponse(e.to_string()))?;

        Ok(parse_results(response, request.min_score))
    }
}

#[async_trait]
impl KnowledgeRetriever for ManagedRetriever {
    async fn retrieve(&self, request: &RetrieveRequest) -> concierge_core::Result<Retrieval> {
        let start = Instant::now();
        let passages = self.search(request).await?;
        let (evidence, accepted) = assemble_evidence(&passages, request.min_score);
        let latency_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            knowledge_base = %self.config.name,
            results = passages.len(),
            accepted,
            latency_ms,
            "Knowledge base queried"
        );

        Ok(Retrieval {
            evidence,
            accepted,
            latency_ms,
        })
    }

    fn knowledge_base_id(&self) -> &str {
        &self.config.knowledge_base_id
    }

    fn source_bucket(&self) -> Option<&str> {
        self.config.source_bucket.as_deref()
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

/// Wire body for a retrieve call
fn build_request_body(request: &RetrieveRequest) -> RetrieveBody {
    RetrieveBody {
        retrieval_query: RetrievalQuery {
            text: trailing_window(&request.query, MAX_QUERY_CHARS).to_string(),
        },
        retrieval_configuration: RetrievalConfiguration {
            vector_search_configuration: VectorSearchConfiguration {
                number_of_results: request.max_results,
                override_search_type: request.search_mode.to_string(),
                filter: request.filter.as_ref().map(WireFilter::from),
            },
        },
    }
}

fn parse_results(response: RetrieveResponse, min_score: f32) -> Vec<ScoredPassage> {
    response
        .retrieval_results
        .into_iter()
        .map(|result| {
            let source = result
                .metadata
                .as_ref()
                .and_then(|m| m.get(SOURCE_URI_KEY))
                .and_then(|v| v.as_str())
                .unwrap_or("N/A");
            let marker = match result.score {
                Some(score) if score >= min_score => "[x]",
                _ => "[ ]",
            };
            tracing::debug!(source, score = ?result.score, "{} retrieval result", marker);

            ScoredPassage {
                text: result.content.and_then(|c| c.text),
                score: result.score,
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveBody {
    retrieval_query: RetrievalQuery,
    retrieval_configuration: RetrievalConfiguration,
}

#[derive(Debug, Serialize)]
struct RetrievalQuery {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfiguration {
    vector_search_configuration: VectorSearchConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchConfiguration {
    number_of_results: usize,
    override_search_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<WireFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WireFilter {
    StartsWith { key: String, value: String },
}

impl From<&SourceFilter> for WireFilter {
    fn from(filter: &SourceFilter) -> Self {
        match filter {
            SourceFilter::StartsWith { key, value } => WireFilter::StartsWith {
                key: key.clone(),
                value: value.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct RetrievalResult {
    #[serde(default)]
    content: Option<ResultContent>,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ResultContent {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_config::Settings;
    use serde_json::json;

    fn retriever() -> ManagedRetriever {
        let settings = Settings::default();
        let descriptor = settings.find_knowledge_base("Default").unwrap();
        let mut config = ManagedRetrieverConfig::from_descriptor(descriptor, &settings.retrieval);
        config.endpoint = "http://127.0.0.1:9/".to_string();
        ManagedRetriever::new(config).unwrap()
    }

    #[test]
    fn test_request_uses_descriptor_defaults() {
        let request = retriever().request("pool hours");
        assert_eq!(request.max_results, 5);
        assert!((request.min_score - 0.40).abs() < f32::EPSILON);
        assert_eq!(request.search_mode, SearchMode::Hybrid);
        assert!(request.filter.is_none());
    }

    #[test]
    fn test_retrieve_url() {
        assert_eq!(
            retriever().retrieve_url(),
            "http://127.0.0.1:9/knowledgebases/ALFA/retrieve"
        );
    }

    #[test]
    fn test_body_without_filter() {
        let request = RetrieveRequest::new("Is there a pool?").with_max_results(3);
        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "retrievalQuery": {"text": "Is there a pool?"},
                "retrievalConfiguration": {
                    "vectorSearchConfiguration": {
                        "numberOfResults": 3,
                        "overrideSearchType": "HYBRID"
                    }
                }
            })
        );
    }

    #[test]
    fn test_body_with_brand_filter() {
        let request = RetrieveRequest::new("Is there a pool?")
            .with_search_mode(SearchMode::Semantic)
            .with_filter(SourceFilter::brand_prefix("hotel-docs", "/party-times"));
        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        let config = &body["retrievalConfiguration"]["vectorSearchConfiguration"];
        assert_eq!(config["overrideSearchType"], "SEMANTIC");
        assert_eq!(
            config["filter"],
            json!({"startsWith": {"key": "x-amz-bedrock-kb-source-uri", "value": "s3://hotel-docs/party-times"}})
        );
    }

    #[test]
    fn test_body_truncates_query() {
        let request = RetrieveRequest::new("y".repeat(MAX_QUERY_CHARS + 50));
        let body = build_request_body(&request);
        assert_eq!(body.retrieval_query.text.chars().count(), MAX_QUERY_CHARS);
    }

    #[test]
    fn test_parse_results() {
        let response: RetrieveResponse = serde_json::from_value(json!({
            "retrievalResults": [
                {"content": {"text": "Pool opens at 7am."}, "score": 0.71,
                 "location": {"type": "S3"},
                 "metadata": {"x-amz-bedrock-kb-source-uri": "s3://hotel-docs/party-times/pool.md"}},
                {"content": {}, "score": 0.9},
                {"content": {"text": "No score."}}
            ]
        }))
        .unwrap();

        let passages = parse_results(response, 0.4);
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0], ScoredPassage::new("Pool opens at 7am.", 0.71));
        assert!(passages[1].text.is_none());
        assert!(passages[2].score.is_none());

        let (evidence, accepted) = assemble_evidence(&passages, 0.4);
        assert_eq!(accepted, 1);
        assert_eq!(evidence.prompt_text(), "Pool opens at 7am.\n");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let retriever = retriever();
        let request = retriever.request("pool hours");
        let result = retriever.retrieve(&request).await;
        assert!(matches!(result, Err(concierge_core::Error::Retrieval(_))));
    }
}
