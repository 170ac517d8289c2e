//! Mistral AI format

use concierge_core::{GenerationParams, PromptInput};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 300;

/// Upper bound the runtime accepts for top-k
pub const MAX_TOP_K: u32 = 200;

/// Mistral / Mixtral instruct format
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralFormat;

impl ProviderFormat for MistralFormat {
    fn family(&self) -> &'static str {
        "mistral"
    }

    fn defaults(&self) -> GenerationParams {
        GenerationParams::default()
            .with_temperature(0.0)
            .with_top_p(1.0)
            .with_top_k(MAX_TOP_K)
            .with_max_tokens(DEFAULT_MAX_TOKENS)
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = MistralRequest {
            prompt: prompt.to_flat_text(),
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k.map(|k| k.min(MAX_TOP_K)),
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<MistralResponse>(body)?
            .outputs
            .into_iter()
            .next()
            .and_then(|o| o.text)
    }
}

#[derive(Debug, Serialize)]
struct MistralRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MistralResponse {
    #[serde(default)]
    outputs: Vec<MistralOutput>,
}

#[derive(Debug, Deserialize)]
struct MistralOutput {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_k_capped() {
        let format = MistralFormat;
        let params = GenerationParams::default()
            .with_top_k(500)
            .or(&format.defaults());
        let body = format
            .build_request(&PromptInput::from("Late checkout?"), &params)
            .unwrap();
        assert_eq!(body["top_k"], 200);

        let params = GenerationParams::default().with_top_k(50).or(&format.defaults());
        let body = format
            .build_request(&PromptInput::from("Late checkout?"), &params)
            .unwrap();
        assert_eq!(body["top_k"], 50);
    }

    #[test]
    fn test_mistral_response() {
        let body = json!({"outputs": [{"text": " Until 1pm.", "stop_reason": "stop"}]});
        assert_eq!(
            MistralFormat.extract_prediction(&body).as_deref(),
            Some(" Until 1pm.")
        );
    }
}
