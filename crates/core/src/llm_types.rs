//! Model invocation request/response types
//!
//! Shared by every provider variant so the agent never sees provider
//! envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversational role of a prompt segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Marker used when the role is encoded inside flat prompt text
    pub fn marker(&self) -> &'static str {
        match self {
            Role::System => "System:",
            Role::User => "Human:",
            Role::Assistant => "Assistant:",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged block of a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: Role,
    pub text: String,
}

impl PromptSegment {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Prompt handed to a model
///
/// `Segmented` is what the prompt builder produces for role-tagged
/// templates. `Flat` is a single string; chat-style providers decode its
/// roles from marker text on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Segmented(Vec<PromptSegment>),
    Flat(String),
}

impl PromptInput {
    /// Render as one string, re-encoding roles with their markers
    pub fn to_flat_text(&self) -> String {
        match self {
            PromptInput::Flat(text) => text.clone(),
            PromptInput::Segmented(segments) => segments
                .iter()
                .map(|s| match s.role {
                    Role::Assistant => format!("{} {}", s.role.marker(), s.text),
                    _ => format!("{}\n{}", s.role.marker(), s.text),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    pub fn is_segmented(&self) -> bool {
        matches!(self, PromptInput::Segmented(_))
    }
}

impl From<String> for PromptInput {
    fn from(text: String) -> Self {
        PromptInput::Flat(text)
    }
}

impl From<&str> for PromptInput {
    fn from(text: &str) -> Self {
        PromptInput::Flat(text.to_string())
    }
}

/// Generation parameters
///
/// Every field is optional. Unset fields fall back to the model
/// descriptor's defaults, then to the provider's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    /// Top-k sampling (Anthropic, Cohere, Mistral)
    pub top_k: Option<u32>,
    /// Penalty scales (AI21 Jurassic)
    pub count_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    /// Likelihood reporting mode (Cohere legacy)
    pub return_likelihoods: Option<String>,
}

impl GenerationParams {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    /// Fill unset fields from `defaults`
    pub fn or(&self, defaults: &GenerationParams) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            stop_sequences: self
                .stop_sequences
                .clone()
                .or_else(|| defaults.stop_sequences.clone()),
            top_k: self.top_k.or(defaults.top_k),
            count_penalty: self.count_penalty.or(defaults.count_penalty),
            presence_penalty: self.presence_penalty.or(defaults.presence_penalty),
            frequency_penalty: self.frequency_penalty.or(defaults.frequency_penalty),
            return_likelihoods: self
                .return_likelihoods
                .clone()
                .or_else(|| defaults.return_likelihoods.clone()),
        }
    }
}

/// Normalized outcome of one model call
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    /// Prompt as sent, flattened for logging and analytics
    pub prompt_text: String,
    /// Provider response body, untouched
    pub raw_response: serde_json::Value,
    /// Normalized predicted text
    pub prediction: String,
    pub request_id: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub invocation_time_ms: u64,
    /// Set when the provider returned no usable prediction
    pub error: Option<String>,
}

impl InvocationResult {
    pub fn is_soft_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_text_reencodes_markers() {
        let prompt = PromptInput::Segmented(vec![
            PromptSegment::system("You are an agent."),
            PromptSegment::user("What time is checkout?"),
            PromptSegment::assistant("Based on the information provided,"),
        ]);
        assert_eq!(
            prompt.to_flat_text(),
            "System:\nYou are an agent.\n\nHuman:\nWhat time is checkout?\n\nAssistant: Based on the information provided,"
        );
    }

    #[test]
    fn test_params_or_prefers_explicit_values() {
        let defaults = GenerationParams::default()
            .with_temperature(0.0)
            .with_max_tokens(1000)
            .with_top_k(200);
        let params = GenerationParams::default().with_temperature(0.5);

        let merged = params.or(&defaults);
        assert_eq!(merged.temperature, Some(0.5));
        assert_eq!(merged.max_tokens, Some(1000));
        assert_eq!(merged.top_k, Some(200));
        assert_eq!(merged.top_p, None);
    }

    #[test]
    fn test_params_deserialize_partial() {
        let params: GenerationParams = serde_json::from_str(r#"{"max_tokens": 300}"#).unwrap();
        assert_eq!(params.max_tokens, Some(300));
        assert!(params.stop_sequences.is_none());
    }
}
