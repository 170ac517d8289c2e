//! Session attributes round-tripped through the dialog platform
//!
//! The dialog platform owns the session and sends a flat string map with
//! every turn. This wrapper gives the well-known keys names and keeps the
//! per-turn diagnostic fields from accumulating.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known session attribute keys
pub mod keys {
    // Selections and toggles
    pub const RAG_LLM: &str = "ragLLM";
    pub const KNOWLEDGE_BASE: &str = "knowledgeBase";
    pub const CONTEXT_SWITCH: &str = "context_switch";
    pub const GUARDRAILS_SWITCH: &str = "guardrails_switch";
    pub const BRAND: &str = "brand";
    pub const CONVERSATION: &str = "conversation";
    pub const FIRST_NAME: &str = "firstName";
    pub const SEND_TO_AGENT: &str = "sendToAgent";

    // Prompt tracking for analytics
    pub const PROMPT_ID: &str = "prompt_id";
    pub const PROMPT: &str = "prompt";
    pub const PRIOR_PROMPT_ID: &str = "prior_prompt_id";
    pub const PRIOR_PROMPT: &str = "prior_prompt";

    // Turn diagnostics
    pub const KNOWLEDGE_BASE_ID: &str = "knowledge_base";
    pub const RETRIEVAL_LATENCY: &str = "retrieval_latency";
    pub const RAG_MODEL_ID: &str = "rag_llm";
    pub const RAG_REQUEST_ID: &str = "rag_request_id";
    pub const RAG_INPUT_TOKENS: &str = "rag_input_tokens";
    pub const RAG_OUTPUT_TOKENS: &str = "rag_output_tokens";
    pub const RAG_LATENCY: &str = "rag_latency";
    pub const TOTAL_LATENCY: &str = "total_latency";

    // Labeled test cases
    pub const GROUND_TRUTH: &str = "ground-truth";
    pub const EVALUATION_LLM: &str = "evaluationLLM";
    pub const DETECTION_LLM: &str = "detectionLLM";
    pub const EVALUATION_RESULT: &str = "evaluation_result";
    pub const EVALUATION_DETAILS: &str = "evaluation_details";
    pub const EVALUATION_LATENCY: &str = "evaluation_latency";
    pub const EVALUATION_MODEL_ID: &str = "evaluation_llm";
    pub const DETECTION_RESULT: &str = "detection_result";
    pub const DETECTION_DETAILS: &str = "detection_details";
    pub const DETECTION_LATENCY: &str = "detection_latency";
    pub const DETECTION_MODEL_ID: &str = "detection_llm";

    /// Fields rewritten on every answered turn
    pub const DIAGNOSTICS: [&str; 6] = [
        RAG_REQUEST_ID,
        RAG_INPUT_TOKENS,
        RAG_OUTPUT_TOKENS,
        RETRIEVAL_LATENCY,
        RAG_LATENCY,
        TOTAL_LATENCY,
    ];
}

/// Switch value meaning "enabled"
pub const SWITCH_ON: &str = "1";
/// Switch value meaning "disabled"
pub const SWITCH_OFF: &str = "0";

const START_PROMPT_ID: &str = "Start-Conversation";
const START_PROMPT: &str = "(start of conversation)";

/// Flat string map of session attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionAttributes(BTreeMap<String, String>);

impl SessionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value, including empty strings
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value only when present and non-empty
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Switches default to on; only the literal `"1"` counts as enabled
    pub fn switch_enabled(&self, key: &str) -> bool {
        self.get(key).unwrap_or(SWITCH_ON) == SWITCH_ON
    }

    /// Drop the diagnostics written by the previous turn
    pub fn purge_diagnostics(&mut self) {
        for key in keys::DIAGNOSTICS {
            self.0.remove(key);
        }
    }

    /// Move the last prompt into the prior-prompt slots
    pub fn rotate_prompt_tracking(&mut self) {
        let prior_id = self
            .remove(keys::PROMPT_ID)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| START_PROMPT_ID.to_string());
        self.set(keys::PRIOR_PROMPT_ID, prior_id);

        let prior_prompt = self
            .remove(keys::PROMPT)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| START_PROMPT.to_string());
        self.set(keys::PRIOR_PROMPT, prior_prompt);
    }

    /// Fill in selections and switches that are unset or empty
    pub fn apply_defaults(&mut self, default_model: &str, default_knowledge_base: &str) {
        let defaults = [
            (keys::RAG_LLM, default_model),
            (keys::KNOWLEDGE_BASE, default_knowledge_base),
            (keys::CONTEXT_SWITCH, SWITCH_ON),
            (keys::GUARDRAILS_SWITCH, SWITCH_ON),
        ];
        for (key, value) in defaults {
            if self.get_non_empty(key).is_none() {
                self.set(key, value);
            }
        }
    }

    /// Record which prompt was played, for analytics
    pub fn set_prompt(&mut self, prompt_id: impl Into<String>, prompt: impl Into<String>) {
        self.set(keys::PROMPT_ID, prompt_id);
        self.set(keys::PROMPT, prompt);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for SessionAttributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> SessionAttributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_switch_defaults_on() {
        let session = SessionAttributes::new();
        assert!(session.switch_enabled(keys::CONTEXT_SWITCH));

        let session = attrs(&[(keys::CONTEXT_SWITCH, "0")]);
        assert!(!session.switch_enabled(keys::CONTEXT_SWITCH));

        let session = attrs(&[(keys::GUARDRAILS_SWITCH, "yes")]);
        assert!(!session.switch_enabled(keys::GUARDRAILS_SWITCH));
    }

    #[test]
    fn test_purge_diagnostics_keeps_other_keys() {
        let mut session = attrs(&[
            (keys::RAG_REQUEST_ID, "req-1"),
            (keys::TOTAL_LATENCY, "900"),
            (keys::RAG_MODEL_ID, "anthropic.claude-3-haiku-20240307-v1:0"),
            (keys::BRAND, "Example Corp Party Times"),
        ]);
        session.purge_diagnostics();

        assert!(!session.contains(keys::RAG_REQUEST_ID));
        assert!(!session.contains(keys::TOTAL_LATENCY));
        assert!(session.contains(keys::RAG_MODEL_ID));
        assert_eq!(session.get(keys::BRAND), Some("Example Corp Party Times"));
    }

    #[test]
    fn test_rotate_prompt_tracking() {
        let mut session = SessionAttributes::new();
        session.rotate_prompt_tracking();
        assert_eq!(session.get(keys::PRIOR_PROMPT_ID), Some("Start-Conversation"));
        assert_eq!(session.get(keys::PRIOR_PROMPT), Some("(start of conversation)"));

        session.set_prompt("Help-Message", "You can ask questions.");
        session.rotate_prompt_tracking();
        assert_eq!(session.get(keys::PRIOR_PROMPT_ID), Some("Help-Message"));
        assert_eq!(session.get(keys::PRIOR_PROMPT), Some("You can ask questions."));
        assert!(!session.contains(keys::PROMPT_ID));
        assert!(!session.contains(keys::PROMPT));
    }

    #[test]
    fn test_apply_defaults_only_fills_gaps() {
        let mut session = attrs(&[(keys::RAG_LLM, "Mistral Large"), (keys::KNOWLEDGE_BASE, "")]);
        session.apply_defaults("Default", "Default");

        assert_eq!(session.get(keys::RAG_LLM), Some("Mistral Large"));
        assert_eq!(session.get(keys::KNOWLEDGE_BASE), Some("Default"));
        assert_eq!(session.get(keys::CONTEXT_SWITCH), Some("1"));
        assert_eq!(session.get(keys::GUARDRAILS_SWITCH), Some("1"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let session = attrs(&[("a", "1")]);
        assert_eq!(serde_json::to_string(&session).unwrap(), r#"{"a":"1"}"#);
    }
}
