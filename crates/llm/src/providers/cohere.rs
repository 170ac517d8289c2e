//! Cohere Command formats

use concierge_core::{GenerationParams, PromptInput};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 300;

fn cohere_defaults() -> GenerationParams {
    GenerationParams::default()
        .with_temperature(0.0)
        .with_top_p(0.99)
        .with_top_k(200)
        .with_max_tokens(DEFAULT_MAX_TOKENS)
}

/// Command / Command Light generation format
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereCommandFormat;

impl ProviderFormat for CohereCommandFormat {
    fn family(&self) -> &'static str {
        "cohere-command"
    }

    fn defaults(&self) -> GenerationParams {
        GenerationParams {
            return_likelihoods: Some("NONE".to_string()),
            ..cohere_defaults()
        }
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = CommandRequest {
            prompt: prompt.to_flat_text(),
            temperature: params.temperature,
            p: params.top_p,
            k: params.top_k,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop_sequences: params.stop_sequences.clone().unwrap_or_default(),
            return_likelihoods: params.return_likelihoods.clone(),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<CommandResponse>(body)?
            .generations
            .into_iter()
            .next()
            .and_then(|g| g.text)
    }
}

/// Command R / R+ chat format
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereCommandRFormat;

impl ProviderFormat for CohereCommandRFormat {
    fn family(&self) -> &'static str {
        "cohere-command-r"
    }

    fn defaults(&self) -> GenerationParams {
        cohere_defaults()
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = CommandRRequest {
            message: prompt.to_flat_text(),
            temperature: params.temperature,
            p: params.top_p,
            k: params.top_k,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop_sequences: params.stop_sequences.clone().unwrap_or_default(),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<CommandRResponse>(body)?.text
    }
}

#[derive(Debug, Serialize)]
struct CommandRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
    max_tokens: u32,
    stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_likelihoods: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    generations: Vec<CommandGeneration>,
}

#[derive(Debug, Deserialize)]
struct CommandGeneration {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommandRRequest {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
    max_tokens: u32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommandRResponse {
    text: Option<String>,
}
