//! AI21 Labs formats
//!
//! Jurassic-2 takes a flat prompt with penalty objects. Jamba takes chat
//! messages.

use concierge_core::{GenerationParams, PromptInput, Role};
use serde::{Deserialize, Serialize};

use super::{decode, ProviderFormat};
use crate::roles::segments_of;
use crate::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 300;

fn ai21_defaults() -> GenerationParams {
    GenerationParams::default()
        .with_temperature(0.0)
        .with_top_p(1.0)
        .with_max_tokens(DEFAULT_MAX_TOKENS)
}

/// Jurassic-2 completion format
#[derive(Debug, Clone, Copy, Default)]
pub struct JurassicFormat;

impl ProviderFormat for JurassicFormat {
    fn family(&self) -> &'static str {
        "ai21-jurassic"
    }

    fn defaults(&self) -> GenerationParams {
        ai21_defaults()
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let request = JurassicRequest {
            prompt: prompt.to_flat_text(),
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop_sequences: params.stop_sequences.clone().unwrap_or_default(),
            count_penalty: Penalty::from(params.count_penalty),
            presence_penalty: Penalty::from(params.presence_penalty),
            frequency_penalty: Penalty::from(params.frequency_penalty),
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<JurassicResponse>(body)?
            .completions
            .into_iter()
            .next()
            .and_then(|c| c.data.text)
    }
}

/// Jamba chat format
#[derive(Debug, Clone, Copy, Default)]
pub struct JambaFormat;

impl ProviderFormat for JambaFormat {
    fn family(&self) -> &'static str {
        "ai21-jamba"
    }

    fn defaults(&self) -> GenerationParams {
        ai21_defaults()
    }

    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError> {
        let messages = segments_of(prompt)
            .into_iter()
            .map(|segment| JambaMessage {
                role: match segment.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: segment.text.trim().to_string(),
            })
            .collect();

        let request = JambaRequest {
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stop: params.stop_sequences.clone().unwrap_or_default(),
            messages,
        };
        Ok(serde_json::to_value(request)?)
    }

    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String> {
        decode::<JambaResponse>(body)?
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
    }
}

/// Penalty object; empty when unset
#[derive(Debug, Serialize)]
struct Penalty {
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f32>,
}

impl From<Option<f32>> for Penalty {
    fn from(scale: Option<f32>) -> Self {
        Self { scale }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JurassicRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
    stop_sequences: Vec<String>,
    count_penalty: Penalty,
    presence_penalty: Penalty,
    frequency_penalty: Penalty,
}

#[derive(Debug, Deserialize)]
struct JurassicResponse {
    #[serde(default)]
    completions: Vec<JurassicCompletion>,
}

#[derive(Debug, Deserialize)]
struct JurassicCompletion {
    data: JurassicData,
}

#[derive(Debug, Deserialize)]
struct JurassicData {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct JambaRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
    stop: Vec<String>,
    messages: Vec<JambaMessage>,
}

#[derive(Debug, Serialize)]
struct JambaMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct JambaResponse {
    #[serde(default)]
    choices: Vec<JambaChoice>,
}

#[derive(Debug, Deserialize)]
struct JambaChoice {
    message: JambaChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct JambaChoiceMessage {
    content: Option<String>,
}
