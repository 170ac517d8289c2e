//! Turn orchestration
//!
//! One caller utterance in, one answer out:
//! 1. resolve the agent and knowledge base from the session, unknown names
//!    falling back to the defaults
//! 2. resolve the brand filter
//! 3. build the rolling transcript from stored history
//! 4. retrieve evidence (failures degrade to "no evidence")
//! 5. generate the answer
//! 6. update history and diagnostics
//! 7. hand the turn to the verification queue

use std::sync::Arc;
use std::time::Instant;

use concierge_config::constants::conversation as conversation_defaults;
use concierge_config::Settings;
use concierge_core::session::keys;
use concierge_core::{
    ConversationHistory, Retrieval, SessionAttributes, Turn, VerificationJob, VerificationQueue,
};
use concierge_rag::trailing_window;

use crate::agent::ResponseFlags;
use crate::brand::ANY_BRAND;
use crate::registry::Registry;
use crate::AgentError;

/// Answer given when a turn cannot be completed
pub const GENERIC_FAILURE: &str = "I'm sorry, something went wrong. Please try again.";

const LLM_RESPONSE_PROMPT: &str = "(LLM response)";

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Turns kept in session history
    pub max_turns: usize,
    /// Trailing transcript characters sent as the retrieval query
    pub query_max_chars: usize,
    /// Model for labeled-test evaluation when the session names none
    pub evaluation_model: Option<String>,
    /// Model for labeled-test detection when the session names none
    pub detection_model: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: conversation_defaults::MAX_TURNS,
            query_max_chars: conversation_defaults::QUERY_MAX_CHARS,
            evaluation_model: None,
            detection_model: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_turns: settings.conversation.max_turns,
            query_max_chars: settings.retrieval.query_max_chars,
            evaluation_model: settings.conversation.evaluation_model.clone(),
            detection_model: settings.conversation.detection_model.clone(),
        }
    }
}

/// Brand slot as filled by the dialog platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandSlot {
    /// What the caller said
    pub original_value: Option<String>,
    /// Canonical brand name
    pub interpreted_value: Option<String>,
}

/// One caller utterance routed to the orchestrator
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub intent_name: String,
    pub input_transcript: String,
    pub brand_slot: Option<BrandSlot>,
    /// Raw platform event, forwarded to the verification queue
    pub event: serde_json::Value,
}

impl TurnRequest {
    pub fn new(intent_name: impl Into<String>, input_transcript: impl Into<String>) -> Self {
        Self {
            intent_name: intent_name.into(),
            input_transcript: input_transcript.into(),
            brand_slot: None,
            event: serde_json::Value::Null,
        }
    }

    pub fn with_brand_slot(mut self, slot: BrandSlot) -> Self {
        self.brand_slot = Some(slot);
        self
    }

    pub fn with_event(mut self, event: serde_json::Value) -> Self {
        self.event = event;
        self
    }
}

/// Result of a turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Question as recorded in history, after brand substitution
    pub question: String,
    pub answer: String,
    /// Evidence text given to the model, when retrieval ran
    pub evidence: Option<String>,
}

/// Runs answered turns against the registry
pub struct TurnOrchestrator {
    registry: Arc<Registry>,
    queue: Option<Arc<dyn VerificationQueue>>,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(registry: Arc<Registry>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            queue: None,
            config,
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn VerificationQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Answer a turn, turning failures into the generic apology
    pub async fn answer(&self, request: &TurnRequest, attrs: &mut SessionAttributes) -> TurnOutcome {
        metrics::counter!("concierge_turns_total").increment(1);

        match self.handle_turn(request, attrs).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(intent = %request.intent_name, error = %e, "Turn failed");
                metrics::counter!("concierge_turn_failures_total").increment(1);
                attrs.set_prompt(format!("{}-LLM-Error", request.intent_name), GENERIC_FAILURE);
                TurnOutcome {
                    question: request.input_transcript.clone(),
                    answer: GENERIC_FAILURE.to_string(),
                    evidence: None,
                }
            }
        }
    }

    /// Run one turn
    ///
    /// Retrieval and enqueue failures are absorbed; model failures return
    /// `Err`.
    pub async fn handle_turn(
        &self,
        request: &TurnRequest,
        attrs: &mut SessionAttributes,
    ) -> Result<TurnOutcome, AgentError> {
        let start = Instant::now();

        let model_name = attrs.get(keys::RAG_LLM).unwrap_or_default().to_string();
        let agent = match self.registry.agent(&model_name) {
            Some(agent) => agent,
            None => {
                tracing::warn!(model = %model_name, "Unknown model, using default");
                let agent = self
                    .registry
                    .default_agent()
                    .ok_or_else(|| AgentError::Configuration("no default model".to_string()))?;
                attrs.set(keys::RAG_LLM, agent.name());
                agent
            }
        };

        // Brand: explicit slot, then stored value, then a single brand in the last answer
        let mut question = request.input_transcript.clone();
        let mut brand = attrs.get_non_empty(keys::BRAND).map(str::to_string);
        if let Some(slot) = &request.brand_slot {
            brand = slot.interpreted_value.clone().filter(|b| !b.is_empty());
            if let Some(interpreted) = &brand {
                attrs.set(keys::BRAND, interpreted.clone());
                if let Some(original) = slot.original_value.as_deref().filter(|o| !o.is_empty()) {
                    if interpreted != ANY_BRAND {
                        question = question.replace(original, interpreted);
                    }
                }
            }
        }

        let mut history =
            ConversationHistory::from_json(attrs.get(keys::CONVERSATION), self.config.max_turns);
        let transcript = history.transcript(&question);

        if request.brand_slot.is_none() {
            if let Some(single) = history
                .last_answer()
                .and_then(|answer| self.registry.brands().single_brand_mentioned(answer))
            {
                tracing::debug!(brand = %single.name, "Brand implied by last answer");
                brand = Some(single.name.clone());
                attrs.set(keys::BRAND, single.name.clone());
            }
        }

        let kb_name = attrs.get(keys::KNOWLEDGE_BASE).unwrap_or_default().to_string();
        let knowledge_base = match self.registry.knowledge_base(&kb_name) {
            Some(kb) => kb,
            None => {
                tracing::warn!(knowledge_base = %kb_name, "Unknown knowledge base, using default");
                self.registry.default_knowledge_base().ok_or_else(|| {
                    AgentError::Configuration("no default knowledge base".to_string())
                })?
            }
        };

        let filter = knowledge_base
            .source_bucket()
            .map(|bucket| self.registry.brands().source_filter(bucket, brand.as_deref()));
        let query = trailing_window(&transcript, self.config.query_max_chars);
        let retrieve_request = knowledge_base.request(query, filter);

        let retrieval_start = Instant::now();
        let retrieval = match knowledge_base.retriever.retrieve(&retrieve_request).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::warn!(
                    knowledge_base = %knowledge_base.name(),
                    error = %e,
                    "Retrieval failed, answering without evidence"
                );
                metrics::counter!("concierge_retrieval_failures_total").increment(1);
                Retrieval::empty(retrieval_start.elapsed().as_millis() as u64)
            }
        };
        metrics::histogram!("concierge_retrieval_latency_ms").record(retrieval.latency_ms as f64);
        let evidence = retrieval.evidence.prompt_text().to_string();

        let flags = ResponseFlags {
            use_context: attrs.switch_enabled(keys::CONTEXT_SWITCH),
            guardrails: attrs.switch_enabled(keys::GUARDRAILS_SWITCH),
        };
        let generated = agent.generate_response(&evidence, &transcript, flags).await?;
        metrics::histogram!("concierge_model_latency_ms").record(generated.latency_ms as f64);

        history.push(Turn::new(question.clone(), generated.response.clone()));
        attrs.set(keys::CONVERSATION, history.to_json()?);

        attrs.set(keys::KNOWLEDGE_BASE_ID, knowledge_base.retriever.knowledge_base_id());
        attrs.set(keys::RETRIEVAL_LATENCY, retrieval.latency_ms.to_string());
        attrs.set(keys::RAG_MODEL_ID, agent.model_id());
        if let Some(request_id) = &generated.request_id {
            attrs.set(keys::RAG_REQUEST_ID, request_id.clone());
        }
        if let Some(tokens) = generated.input_tokens {
            attrs.set(keys::RAG_INPUT_TOKENS, tokens.to_string());
        }
        if let Some(tokens) = generated.output_tokens {
            attrs.set(keys::RAG_OUTPUT_TOKENS, tokens.to_string());
        }
        attrs.set(keys::RAG_LATENCY, generated.latency_ms.to_string());
        attrs.set(
            keys::TOTAL_LATENCY,
            (generated.latency_ms + retrieval.latency_ms).to_string(),
        );
        attrs.set_prompt(format!("{}-LLM-Response", request.intent_name), LLM_RESPONSE_PROMPT);

        self.enqueue(request, &question, &generated.response, &evidence).await;

        tracing::info!(
            intent = %request.intent_name,
            model = %agent.name(),
            knowledge_base = %knowledge_base.name(),
            brand = ?brand,
            matches = retrieval.accepted,
            turns = history.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Turn answered"
        );

        Ok(TurnOutcome {
            question,
            answer: generated.response,
            evidence: Some(evidence),
        })
    }

    /// Evaluate and check a labeled test turn
    ///
    /// Runs only when the session carries a ground-truth answer. Results are
    /// written to the session; failures are logged and never fail the turn.
    pub async fn run_labeled_checks(
        &self,
        attrs: &mut SessionAttributes,
        question: &str,
        answer: &str,
        evidence: Option<&str>,
    ) {
        let Some(ground_truth) = attrs.get_non_empty(keys::GROUND_TRUTH).map(str::to_string) else {
            return;
        };

        let evaluation_model = attrs
            .get_non_empty(keys::EVALUATION_LLM)
            .map(str::to_string)
            .or_else(|| self.config.evaluation_model.clone())
            .unwrap_or_default();
        match self.registry.agent(&evaluation_model) {
            Some(evaluator) => {
                match evaluator.evaluate_response(question, answer, &ground_truth).await {
                    Ok(result) => {
                        tracing::info!(
                            classification = %result.classification,
                            rationale = %result.rationale,
                            "Labeled turn evaluated"
                        );
                        attrs.set(keys::EVALUATION_RESULT, result.classification.as_str());
                        attrs.set(keys::EVALUATION_DETAILS, result.rationale);
                        attrs.set(keys::EVALUATION_LATENCY, result.latency_ms.to_string());
                        attrs.set(keys::EVALUATION_MODEL_ID, evaluator.model_id());
                    }
                    Err(e) => tracing::warn!(error = %e, "Evaluation failed"),
                }
            }
            None => tracing::warn!(model = %evaluation_model, "Unknown evaluation model"),
        }

        // Answered turns always carry evidence, the no-information text included;
        // only failed turns arrive without it
        let Some(evidence) = evidence else {
            tracing::debug!("No evidence for a failed turn, skipping detection");
            return;
        };
        let detection_model = attrs
            .get_non_empty(keys::DETECTION_LLM)
            .map(str::to_string)
            .or_else(|| self.config.detection_model.clone())
            .unwrap_or_default();
        match self.registry.agent(&detection_model) {
            Some(detector) => match detector.detect_hallucination(question, answer, evidence).await {
                Ok(result) => {
                    tracing::info!(
                        classification = %result.classification,
                        rationale = %result.rationale,
                        "Labeled turn checked"
                    );
                    attrs.set(keys::DETECTION_RESULT, result.classification.as_str());
                    attrs.set(keys::DETECTION_DETAILS, result.rationale);
                    attrs.set(keys::DETECTION_LATENCY, result.latency_ms.to_string());
                    attrs.set(keys::DETECTION_MODEL_ID, detector.model_id());
                }
                Err(e) => tracing::warn!(error = %e, "Detection failed"),
            },
            None => tracing::warn!(model = %detection_model, "Unknown detection model"),
        }
    }

    async fn enqueue(&self, request: &TurnRequest, question: &str, answer: &str, evidence: &str) {
        let Some(queue) = &self.queue else {
            return;
        };

        let job = VerificationJob::new(request.event.clone(), question, answer, evidence);
        match queue.enqueue(&job).await {
            Ok(()) => tracing::debug!(queue = %queue.name(), "Turn queued for verification"),
            Err(e) => {
                tracing::error!(queue = %queue.name(), error = %e, "Failed to queue turn for verification");
                metrics::counter!("concierge_enqueue_failures_total").increment(1);
            }
        }
    }
}
