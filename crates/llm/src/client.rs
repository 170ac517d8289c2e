//! HTTP client for the inference runtime
//!
//! Every provider shares the same transport: the provider-specific JSON body
//! is POSTed to `{endpoint}/model/{model_id}/invoke` and the JSON response is
//! returned untouched together with the metadata headers.

use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::Client;

use concierge_config::constants::{endpoints, timeouts};

use crate::LlmError;

/// Response header carrying the runtime request id
pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";
/// Response header carrying the prompt token count
pub const INPUT_TOKENS_HEADER: &str = "x-amzn-bedrock-input-token-count";
/// Response header carrying the completion token count
pub const OUTPUT_TOKENS_HEADER: &str = "x-amzn-bedrock-output-token-count";

/// Client configuration
#[derive(Debug, Clone)]
pub struct InvokeClientConfig {
    /// Runtime base URL
    pub endpoint: String,
    /// Optional bearer token
    pub bearer_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for InvokeClientConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::INFERENCE_DEFAULT.to_string(),
            bearer_token: None,
            timeout: Duration::from_millis(timeouts::INFERENCE_MS),
        }
    }
}

impl InvokeClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response body plus metadata headers
#[derive(Debug, Clone)]
pub struct RawInvocation {
    pub body: serde_json::Value,
    pub request_id: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub elapsed_ms: u64,
}

/// Shared inference runtime client
pub struct InvokeClient {
    config: InvokeClientConfig,
    client: Client,
}

impl InvokeClient {
    pub fn new(config: InvokeClientConfig) -> Result<Self, LlmError> {
        if config.endpoint.trim().is_empty() {
            return Err(LlmError::Configuration(
                "inference endpoint not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Invocation URL for a model
    pub fn invoke_url(&self, model_id: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.config.endpoint.trim_end_matches('/'),
            model_id
        )
    }

    /// POST a provider body and return the decoded response
    pub async fn invoke_model(
        &self,
        model_id: &str,
        body: &serde_json::Value,
    ) -> Result<RawInvocation, LlmError> {
        let start = Instant::now();

        let mut request = self
            .client
            .post(self.invoke_url(model_id))
            .header("accept", "application/json")
            .json(body);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let headers = response.headers().clone();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(RawInvocation {
            body,
            request_id: header_str(&headers, REQUEST_ID_HEADER),
            input_tokens: header_u32(&headers, INPUT_TOKENS_HEADER),
            output_tokens: header_u32(&headers, OUTPUT_TOKENS_HEADER),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    header_str(headers, name).and_then(|v| v.trim().parse().ok())
}
