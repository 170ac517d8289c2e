//! Conversational agent
//!
//! Composes one model and one template table. The agent holds no per-turn
//! state; context and guardrail flags are passed with each call.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use concierge_core::{GenerationParams, InvocationResult, ModelInvoker, PromptInput, VerificationResult};

use crate::prompt::{placeholders, PromptBuilder};
use crate::templates::{TemplateKind, TemplateTable};
use crate::verdict::{parse_comparison, parse_detection, parse_evaluation, Verdict};
use crate::AgentError;

/// Per-call switches for answer generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFlags {
    /// Include retrieved evidence in the prompt
    pub use_context: bool,
    /// Use the refusal-policy guardrail block
    pub guardrails: bool,
}

impl Default for ResponseFlags {
    fn default() -> Self {
        Self {
            use_context: true,
            guardrails: true,
        }
    }
}

/// Generated answer with invocation metadata
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedResponse {
    /// Rendered prompt, flattened
    pub prompt: String,
    pub response: String,
    pub request_id: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Answers, evaluates, compares and checks responses with one model
pub struct ConversationalAgent {
    model: Arc<dyn ModelInvoker>,
    templates: Arc<TemplateTable>,
    builder: PromptBuilder,
    params: GenerationParams,
}

impl ConversationalAgent {
    pub fn new(model: Arc<dyn ModelInvoker>, templates: Arc<TemplateTable>) -> Self {
        Self {
            model,
            templates,
            builder: PromptBuilder::default(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_builder(mut self, builder: PromptBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Per-call parameter overrides
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    /// Render the answer prompt for the given flags
    pub fn build_answer_prompt(&self, evidence: &str, transcript: &str, flags: ResponseFlags) -> PromptInput {
        let kind = if flags.use_context {
            TemplateKind::Answer
        } else {
            TemplateKind::AnswerNoContext
        };
        self.builder.build(
            &self.templates,
            kind,
            flags.guardrails,
            &[
                (placeholders::CONTEXT, evidence),
                (placeholders::USER_QUESTION, transcript),
            ],
        )
    }

    /// Answer the caller from evidence and the rolling transcript
    pub async fn generate_response(
        &self,
        evidence: &str,
        transcript: &str,
        flags: ResponseFlags,
    ) -> Result<GeneratedResponse, AgentError> {
        let prompt = self.build_answer_prompt(evidence, transcript, flags);
        let result = self.model.invoke(&prompt, &self.params).await?;

        let response = self.post_process(&result.prediction);
        tracing::info!(
            model = %self.name(),
            request_id = ?result.request_id,
            latency_ms = result.invocation_time_ms,
            use_context = flags.use_context,
            guardrails = flags.guardrails,
            "Response generated"
        );

        Ok(GeneratedResponse {
            prompt: result.prompt_text,
            response,
            request_id: result.request_id,
            input_tokens: result.input_tokens,
            output_tokens: result.output_tokens,
            latency_ms: result.invocation_time_ms,
            error: result.error,
        })
    }

    /// Check an answer against a verified ground-truth answer
    pub async fn evaluate_response(
        &self,
        question: &str,
        answer: &str,
        ground_truth: &str,
    ) -> Result<VerificationResult, AgentError> {
        let question = single_line(question);
        let answer = single_line(answer);
        let ground_truth = single_line(ground_truth);

        let prompt = self.builder.build(
            &self.templates,
            TemplateKind::Evaluation,
            true,
            &[
                (placeholders::QUESTION, &question),
                (placeholders::GROUND_TRUTH, &ground_truth),
                (placeholders::ANSWER, &answer),
            ],
        );
        self.verify(prompt, parse_evaluation).await
    }

    /// Judge which of two answers is better supported by a document
    pub async fn compare_responses(
        &self,
        question: &str,
        document: &str,
        answer_1: &str,
        answer_2: &str,
    ) -> Result<VerificationResult, AgentError> {
        let prompt = self.builder.build(
            &self.templates,
            TemplateKind::Comparison,
            true,
            &[
                (placeholders::QUESTION, question.trim()),
                (placeholders::DOCUMENT, document),
                (placeholders::ANSWER_1, answer_1.trim()),
                (placeholders::ANSWER_2, answer_2.trim()),
            ],
        );
        self.verify(prompt, parse_comparison).await
    }

    /// Check whether an answer is supported by the evidence it was given
    pub async fn detect_hallucination(
        &self,
        question: &str,
        answer: &str,
        document: &str,
    ) -> Result<VerificationResult, AgentError> {
        let question = single_line(question);
        let answer = single_line(answer);

        let prompt = self.builder.build(
            &self.templates,
            TemplateKind::Detection,
            true,
            &[
                (placeholders::QUESTION, &question),
                (placeholders::DOCUMENT, document),
                (placeholders::ANSWER, &answer),
            ],
        );
        self.verify(prompt, parse_detection).await
    }

    async fn verify(
        &self,
        prompt: PromptInput,
        parse: fn(&str) -> Verdict,
    ) -> Result<VerificationResult, AgentError> {
        let start = Instant::now();
        let result = self.model.invoke(&prompt, &self.params).await?;
        let verdict = parse(&result.prediction);

        tracing::debug!(
            model = %self.name(),
            classification = %verdict.classification,
            rationale = %verdict.rationale,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Verdict parsed"
        );

        Ok(verification_result(result, verdict))
    }

    fn post_process(&self, prediction: &str) -> String {
        let response = prediction.replace('\n', " ").trim().to_string();
        if self.templates.capitalize_response {
            capitalize_first(&response)
        } else {
            response
        }
    }
}

fn verification_result(result: InvocationResult, verdict: Verdict) -> VerificationResult {
    VerificationResult {
        classification: verdict.classification,
        rationale: verdict.rationale,
        latency_ms: result.invocation_time_ms,
        prompt: result.prompt_text,
        raw_response: result.raw_response,
        input_tokens: result.input_tokens,
        output_tokens: result.output_tokens,
    }
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use concierge_core::{Classification, Result};
    use parking_lot::Mutex;

    use crate::prompt::PlainDelimiter;

    /// Returns a fixed prediction and records the prompts it saw
    struct ScriptedModel {
        prediction: String,
        prompts: Mutex<Vec<PromptInput>>,
    }

    impl ScriptedModel {
        fn new(prediction: &str) -> Arc<Self> {
            Arc::new(Self {
                prediction: prediction.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedModel {
        async fn invoke(&self, prompt: &PromptInput, _params: &GenerationParams) -> Result<InvocationResult> {
            self.prompts.lock().push(prompt.clone());
            Ok(InvocationResult {
                prompt_text: prompt.to_flat_text(),
                raw_response: serde_json::json!({"text": self.prediction}),
                prediction: self.prediction.clone(),
                request_id: Some("req-1".to_string()),
                input_tokens: Some(120),
                output_tokens: Some(12),
                invocation_time_ms: 42,
                error: None,
            })
        }

        fn model_id(&self) -> &str {
            "test.model-v1"
        }

        fn name(&self) -> &str {
            "Test Model"
        }
    }

    fn agent(model: Arc<ScriptedModel>, table: TemplateTable) -> ConversationalAgent {
        ConversationalAgent::new(model, Arc::new(table)).with_builder(
            PromptBuilder::new(Arc::new(PlainDelimiter))
                .with_date(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_pool_hours_generation() {
        let model = ScriptedModel::new(" The pool is open\nfrom 7am to 10pm. ");
        let agent = agent(model.clone(), TemplateTable::standard());

        let response = agent
            .generate_response(
                "Pool hours are 7am to 10pm daily.\n",
                "What are the pool hours?",
                ResponseFlags::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.response, "The pool is open from 7am to 10pm.");
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
        assert_eq!(response.latency_ms, 42);
        assert!(response.prompt.contains("Pool hours are 7am to 10pm daily."));
        assert!(response.prompt.contains("What are the pool hours?"));
    }

    #[tokio::test]
    async fn test_no_context_flag_drops_evidence() {
        let model = ScriptedModel::new("Sure.");
        let agent = agent(model.clone(), TemplateTable::standard());

        let flags = ResponseFlags {
            use_context: false,
            guardrails: false,
        };
        let response = agent.generate_response("SECRET EVIDENCE", "q", flags).await.unwrap();
        assert!(!response.prompt.contains("SECRET EVIDENCE"));
        assert!(response.prompt.contains("Use your best judgement"));
    }

    #[tokio::test]
    async fn test_role_tagged_capitalizes() {
        let model = ScriptedModel::new("checkout is at 11am.");
        let agent = agent(model.clone(), TemplateTable::role_tagged());

        let response = agent.generate_response("Checkout 11am.", "checkout?", ResponseFlags::default()).await.unwrap();
        assert_eq!(response.response, "Checkout is at 11am.");
        assert!(model.prompts.lock()[0].is_segmented());
    }

    #[tokio::test]
    async fn test_checkout_hallucination() {
        let model = ScriptedModel::new("HALLUCINATED\nThe document says checkout is at 11am,\nnot noon.");
        let agent = agent(model, TemplateTable::standard());

        let result = agent
            .detect_hallucination("What time is checkout?", "Checkout is at noon.", "Checkout is at 11am.\n")
            .await
            .unwrap();
        assert_eq!(result.classification, Classification::Hallucinated);
        assert_eq!(result.rationale, "The document says checkout is at 11am, not noon.");
        assert_eq!(result.latency_ms, 42);
    }

    #[tokio::test]
    async fn test_evaluate_flattens_inputs() {
        let model = ScriptedModel::new("Answer: YES\nSame meaning.");
        let agent = agent(model.clone(), TemplateTable::standard());

        let result = agent
            .evaluate_response("Is there\nparking?", " Yes, valet.\n", "Valet parking\nis available.")
            .await
            .unwrap();
        assert_eq!(result.classification, Classification::Passed);

        let prompt = model.prompts.lock()[0].to_flat_text();
        assert!(prompt.contains("\"Is there parking?\""));
        assert!(prompt.contains("\"Yes, valet.\""));
        assert!(prompt.contains("\"Valet parking is available.\""));
    }

    #[tokio::test]
    async fn test_compare_answers() {
        let model = ScriptedModel::new("Answer: 2\nMore concise.");
        let agent = agent(model, TemplateTable::titan());
        let result = agent.compare_responses("q", "doc", "long answer", "short").await.unwrap();
        assert_eq!(result.classification, Classification::Answer2);

        let model = ScriptedModel::new("Answer: 0\nIdentical.");
        let agent = self::agent(model, TemplateTable::titan());
        let result = agent.compare_responses("q", "doc", "same", "same").await.unwrap();
        assert_eq!(result.classification, Classification::NoEvaluation);
    }

    #[tokio::test]
    async fn test_soft_failure_is_an_error_verdict() {
        let model = ScriptedModel::new("no response from model");
        let agent = agent(model, TemplateTable::standard());
        let result = agent.detect_hallucination("q", "a", "doc").await.unwrap();
        assert_eq!(result.classification, Classification::Error);
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("über"), "Über");
        assert_eq!(capitalize_first(""), "");
    }
}
