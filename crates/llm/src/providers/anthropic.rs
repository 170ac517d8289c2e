//! Anthropic Claude formats
//!
//! Claude 3 and later use the messages body with a separate system field.
//! Instant/V2 models use the legacy text-completion body.

use concierge_core::{GenerationParams, PromptInput, Role};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::roles::segments_of;
use crate::LlmError;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_MAX_TOKENS: u32 = 300;

fn anthropic_defaults() -> GenerationParams {
    GenerationParams::default()
        .with_temperature(0.0)
        .with_top_p(1.0)
        .with_top_k(200)
        .with_max_tokens(DEFAULT_MAX_TOKENS)
}

/// Messages format (Claude 3 family)
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicMessagesFormat;

impl ProviderFormat for AnthropicMessagesFormat {
    fn family(&self) -> &'static str {
        "anthropic"
    }

    fn defaults(&self) -> GenerationParams {
        anthropic_defaults()
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let mut system: Vec<String> = Vec::new();
        let mut messages = Vec::new();
        for segment in segments_of(prompt) {
            match segment.role {
                Role::System => system.push(segment.text.trim().to_string()),
                Role::User => messages.push(ClaudeMessage {
                    role: "user",
                    content: segment.text.trim().to_string(),
                }),
                Role::Assistant => messages.push(ClaudeMessage {
                    role: "assistant",
                    content: segment.text.trim().to_string(),
                }),
            }
        }

        let request = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop_sequences: params.stop_sequences.clone(),
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages,
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        let response: MessagesResponse = decode(body)?;
        response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .find(|text| !text.is_empty())
    }
}

/// Legacy text-completion format (Claude Instant, V2)
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicCompletionFormat;

impl ProviderFormat for AnthropicCompletionFormat {
    fn family(&self) -> &'static str {
        "anthropic-completion"
    }

    fn defaults(&self) -> GenerationParams {
        anthropic_defaults().with_stop_sequences(vec!["\n\nHuman:".to_string()])
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = CompletionRequest {
            prompt: prompt.to_flat_text(),
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_tokens_to_sample: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop_sequences: params.stop_sequences.clone().unwrap_or_default(),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<CompletionResponse>(body)?.completion
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    anthropic_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    max_tokens_to_sample: u32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    completion: Option<String>,
}
