//! Amazon Titan text format

use concierge_core::{GenerationParams, PromptInput};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 300;

/// Titan text generation format
#[derive(Debug, Clone, Copy, Default)]
pub struct TitanFormat;

impl ProviderFormat for TitanFormat {
    fn family(&self) -> &'static str {
        "amazon-titan"
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
        let request = TitanRequest {
            input_text: prompt.to_flat_text(),
            text_generation_config: TitanGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                max_token_count: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                stop_sequences: params.stop_sequences.clone().unwrap_or_default(),
            },
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<TitanResponse>(body)?
            .results
            .into_iter()
            .next()
            .and_then(|r| r.output_text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest {
    input_text: String,
    text_generation_config: TitanGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_token_count: u32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TitanResponse {
    #[serde(default)]
    results: Vec<TitanResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanResult {
    output_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_titan_request_shape() {
        let format = TitanFormat;
        let body = format
            .build_request(&PromptInput::from("Question: pool hours?"), &format.defaults())
            .unwrap();
        assert_eq!(body["inputText"], "Question: pool hours?");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 300);
        assert_eq!(body["textGenerationConfig"]["topP"], 1.0);
        assert_eq!(body["textGenerationConfig"]["stopSequences"], json!([]));
    }

    #[test]
    fn test_titan_response() {
        let format = TitanFormat;
        let body = json!({"results": [{"outputText": "\nOpen daily.", "completionReason": "FINISH"}]});
        assert_eq!(format.extract_prediction(&body).as_deref(), Some("\nOpen daily."));
        assert_eq!(format.extract_prediction(&json!({"results": []})), None);
    }
}
