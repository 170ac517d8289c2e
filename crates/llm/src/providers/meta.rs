//! Meta Llama 3 format

use concierge_core::{GenerationParams, PromptInput};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 300;

/// Llama 3 instruct format
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaFormat;

impl ProviderFormat for LlamaFormat {
    fn family(&self) -> &'static str {
        "meta-llama"
    }

    fn defaults(&self) -> GenerationParams {
        GenerationParams::default()
            .with_temperature(0.0)
            .with_top_p(1.0)
            .with_max_tokens(DEFAULT_MAX_TOKENS)
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = LlamaRequest {
            prompt: prompt.to_flat_text().trim().to_string(),
            temperature: params.temperature,
            top_p: params.top_p,
            max_gen_len: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<LlamaResponse>(body)?.generation
    }
}

#[derive(Debug, Serialize)]
struct LlamaRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_gen_len: u32,
}

#[derive(Debug, Deserialize)]
struct LlamaResponse {
    generation: Option<String>,
}
