//! Turn orchestration and verification integration tests
//!
//! Exercises the full answer path with scripted models, retrievers and
//! queues standing in for the hosted services.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use concierge_agent::{
    BrandSlot, ConversationalAgent, OrchestratorConfig, QueueRecord, Registry, TemplateTable,
    TurnOrchestrator, TurnRequest, VerificationProcessor, GENERIC_FAILURE,
};
use concierge_config::{BrandEntry, KnowledgeBaseDescriptor};
use concierge_core::session::keys;
use concierge_core::{
    ConversationHistory, Error, Evidence, GenerationParams, InvocationResult, KnowledgeRetriever,
    ModelInvoker, PromptInput, Result, RetrieveRequest, Retrieval, SearchMode, SessionAttributes,
    SourceFilter, Turn, VerificationJob, VerificationQueue, NO_INFORMATION,
};

// =============================================================================
// Test doubles
// =============================================================================

/// Replies with queued predictions, repeating the last one
struct ScriptedModel {
    predictions: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedModel {
    fn new(predictions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            predictions: Mutex::new(predictions.iter().map(|p| p.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            predictions: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    async fn invoke(&self, prompt: &PromptInput, _params: &GenerationParams) -> Result<InvocationResult> {
        let text = prompt.to_flat_text();
        self.prompts.lock().push(text.clone());
        if self.fail {
            return Err(Error::Llm("HTTP 503 Service Unavailable".to_string()));
        }

        let prediction = {
            let mut predictions = self.predictions.lock();
            if predictions.len() > 1 {
                predictions.pop_front().unwrap_or_default()
            } else {
                predictions.front().cloned().unwrap_or_default()
            }
        };
        Ok(InvocationResult {
            prompt_text: text,
            raw_response: serde_json::json!({ "completion": prediction }),
            prediction,
            request_id: Some("req-42".to_string()),
            input_tokens: Some(310),
            output_tokens: Some(18),
            invocation_time_ms: 250,
            error: None,
        })
    }

    fn model_id(&self) -> &str {
        "test.scripted-v1"
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

/// Returns fixed evidence and records every request
struct StubRetriever {
    evidence: Option<String>,
    requests: Mutex<Vec<RetrieveRequest>>,
}

impl StubRetriever {
    fn with_evidence(text: &str) -> Arc<Self> {
        Arc::new(Self {
            evidence: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            evidence: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<RetrieveRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl KnowledgeRetriever for StubRetriever {
    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Retrieval> {
        self.requests.lock().push(request.clone());
        match &self.evidence {
            Some(text) => Ok(Retrieval {
                evidence: Evidence::Passages(text.clone()),
                accepted: 1,
                latency_ms: 40,
            }),
            None => Err(Error::Retrieval("HTTP 500 Internal Server Error".to_string())),
        }
    }

    fn knowledge_base_id(&self) -> &str {
        "KB-TEST"
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Collects jobs, or rejects them all
struct RecordingQueue {
    jobs: Mutex<Vec<VerificationJob>>,
    fail: bool,
}

impl RecordingQueue {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(Vec::new()),
            fail,
        })
    }
}

#[async_trait]
impl VerificationQueue for RecordingQueue {
    async fn enqueue(&self, job: &VerificationJob) -> Result<()> {
        if self.fail {
            return Err(Error::Queue("queue unavailable".to_string()));
        }
        self.jobs.lock().push(job.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn descriptor(bucket: Option<&str>) -> KnowledgeBaseDescriptor {
    KnowledgeBaseDescriptor {
        name: "Alfa".to_string(),
        knowledge_base_id: "KB-TEST".to_string(),
        max_results: 5,
        score_threshold: 0.4,
        search_mode: SearchMode::Hybrid,
        source_bucket: bucket.map(str::to_string),
    }
}

fn brands() -> Vec<BrandEntry> {
    vec![
        BrandEntry {
            name: "Example Corp Party Times".to_string(),
            prefix: "/party-times".to_string(),
        },
        BrandEntry {
            name: "Example Corp Waypoint Inns".to_string(),
            prefix: "/waypoint-inns".to_string(),
        },
    ]
}

fn registry(
    model: Arc<ScriptedModel>,
    retriever: Arc<StubRetriever>,
    bucket: Option<&str>,
) -> Arc<Registry> {
    let agent = Arc::new(ConversationalAgent::new(model, Arc::new(TemplateTable::standard())));
    Arc::new(
        Registry::builder()
            .agent("Scripted", agent)
            .knowledge_base(descriptor(bucket), retriever)
            .default_model("Scripted")
            .default_knowledge_base("Alfa")
            .brands(brands())
            .build()
            .unwrap(),
    )
}

fn session() -> SessionAttributes {
    let mut attrs = SessionAttributes::new();
    attrs.apply_defaults("Scripted", "Alfa");
    attrs
}

// =============================================================================
// Answered turns
// =============================================================================

/// Test that a plain question is answered from retrieved evidence
#[tokio::test]
async fn test_pool_hours_turn() {
    let model = ScriptedModel::new(&["The pool is open\nfrom 7am to 10pm daily."]);
    let retriever = StubRetriever::with_evidence("Pool hours are 7am to 10pm daily.\n");
    let queue = RecordingQueue::new(false);
    let orchestrator = TurnOrchestrator::new(
        registry(model.clone(), retriever.clone(), None),
        OrchestratorConfig::default(),
    )
    .with_queue(queue.clone());

    let mut attrs = session();
    let request = TurnRequest::new("GeneralQuestion", "What are the pool hours?");
    let outcome = orchestrator.answer(&request, &mut attrs).await;

    assert_eq!(outcome.answer, "The pool is open from 7am to 10pm daily.");
    assert_eq!(outcome.evidence.as_deref(), Some("Pool hours are 7am to 10pm daily.\n"));

    let requests = retriever.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, "What are the pool hours?");
    assert!(requests[0].filter.is_none());

    assert!(model.prompts()[0].contains("Pool hours are 7am to 10pm daily."));

    let history = ConversationHistory::from_json(attrs.get(keys::CONVERSATION), 4);
    assert_eq!(history.len(), 1);
    assert_eq!(history.last_answer(), Some("The pool is open from 7am to 10pm daily."));

    assert_eq!(attrs.get(keys::KNOWLEDGE_BASE_ID), Some("KB-TEST"));
    assert_eq!(attrs.get(keys::RAG_MODEL_ID), Some("test.scripted-v1"));
    assert_eq!(attrs.get(keys::RAG_REQUEST_ID), Some("req-42"));
    assert_eq!(attrs.get(keys::RAG_INPUT_TOKENS), Some("310"));
    assert_eq!(attrs.get(keys::RAG_LATENCY), Some("250"));
    assert_eq!(attrs.get(keys::RETRIEVAL_LATENCY), Some("40"));
    assert_eq!(attrs.get(keys::TOTAL_LATENCY), Some("290"));
    assert_eq!(attrs.get(keys::PROMPT_ID), Some("GeneralQuestion-LLM-Response"));
    assert_eq!(attrs.get(keys::PROMPT), Some("(LLM response)"));

    let jobs = queue.jobs.lock();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].question, "What are the pool hours?");
    assert_eq!(jobs[0].answer, "The pool is open from 7am to 10pm daily.");
    assert_eq!(jobs[0].context, "Pool hours are 7am to 10pm daily.\n");
}

/// Test that a failed retrieval still produces an answer without evidence
#[tokio::test]
async fn test_retrieval_failure_is_fail_open() {
    let model = ScriptedModel::new(&["I don't have that information."]);
    let retriever = StubRetriever::failing();
    let orchestrator = TurnOrchestrator::new(
        registry(model.clone(), retriever, None),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    let outcome = orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "Is there a spa?"), &mut attrs)
        .await;

    assert_eq!(outcome.answer, "I don't have that information.");
    assert_eq!(outcome.evidence.as_deref(), Some(NO_INFORMATION));
    assert!(model.prompts()[0].contains(NO_INFORMATION));
    assert_eq!(attrs.get(keys::PROMPT_ID), Some("GeneralQuestion-LLM-Response"));
}

/// Test that queue failures never reach the caller
#[tokio::test]
async fn test_enqueue_failure_is_swallowed() {
    let model = ScriptedModel::new(&["Checkout is at 11am."]);
    let retriever = StubRetriever::with_evidence("Checkout is at 11am.\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever, None),
        OrchestratorConfig::default(),
    )
    .with_queue(RecordingQueue::new(true));

    let mut attrs = session();
    let outcome = orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "When is checkout?"), &mut attrs)
        .await;
    assert_eq!(outcome.answer, "Checkout is at 11am.");
}

/// Test that history keeps only the most recent turns and feeds the transcript
#[tokio::test]
async fn test_history_is_capped() {
    let model = ScriptedModel::new(&["Yes."]);
    let retriever = StubRetriever::with_evidence("Everything is allowed.\n");
    let config = OrchestratorConfig {
        max_turns: 2,
        ..OrchestratorConfig::default()
    };
    let orchestrator =
        TurnOrchestrator::new(registry(model.clone(), retriever.clone(), None), config);

    let mut attrs = session();
    for question in ["Pets?", "Parking?", "Breakfast?"] {
        orchestrator
            .answer(&TurnRequest::new("GeneralQuestion", question), &mut attrs)
            .await;
    }

    let history = ConversationHistory::from_json(attrs.get(keys::CONVERSATION), 10);
    let questions: Vec<&str> = history.iter().map(|t| t.question.as_str()).collect();
    assert_eq!(questions, vec!["Parking?", "Breakfast?"]);

    let last_query = &retriever.requests()[2].query;
    assert!(last_query.starts_with("CONVERSATION HISTORY:"));
    assert!(last_query.ends_with("QUESTION: Breakfast?"));
}

/// Test that a long transcript is trimmed to its trailing window for retrieval
#[tokio::test]
async fn test_query_uses_trailing_window() {
    let model = ScriptedModel::new(&["Ok."]);
    let retriever = StubRetriever::with_evidence("Anything.\n");
    let config = OrchestratorConfig {
        query_max_chars: 20,
        ..OrchestratorConfig::default()
    };
    let orchestrator = TurnOrchestrator::new(registry(model, retriever.clone(), None), config);

    let mut attrs = session();
    orchestrator
        .answer(
            &TurnRequest::new("GeneralQuestion", "Tell me everything about the fitness center"),
            &mut attrs,
        )
        .await;

    let query = &retriever.requests()[0].query;
    assert_eq!(query.chars().count(), 20);
    assert!(query.ends_with("fitness center"));
}

// =============================================================================
// Brand resolution
// =============================================================================

/// Test that a brand slot is stored, substituted and used as a filter
#[tokio::test]
async fn test_brand_slot_filters_retrieval() {
    let model = ScriptedModel::new(&["The pool is heated."]);
    let retriever = StubRetriever::with_evidence("Heated pool.\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever.clone(), Some("kb-docs")),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    let request = TurnRequest::new("GeneralQuestion", "Is the party times pool heated?")
        .with_brand_slot(BrandSlot {
            original_value: Some("party times".to_string()),
            interpreted_value: Some("Example Corp Party Times".to_string()),
        });
    let outcome = orchestrator.answer(&request, &mut attrs).await;

    assert_eq!(outcome.question, "Is the Example Corp Party Times pool heated?");
    assert_eq!(attrs.get(keys::BRAND), Some("Example Corp Party Times"));
    assert_eq!(
        retriever.requests()[0].filter,
        Some(SourceFilter::brand_prefix("kb-docs", "/party-times"))
    );
}

/// Test that a single brand named in the last answer scopes the next search
#[tokio::test]
async fn test_single_brand_in_last_answer() {
    let model = ScriptedModel::new(&["Yes, there is free parking."]);
    let retriever = StubRetriever::with_evidence("Free parking.\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever.clone(), Some("kb-docs")),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    let mut history = ConversationHistory::new(4);
    history.push(Turn::new(
        "Where can I stay downtown?",
        "Example Corp Waypoint Inns has a downtown location.",
    ));
    attrs.set(keys::CONVERSATION, history.to_json().unwrap());

    orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "Is there parking?"), &mut attrs)
        .await;

    assert_eq!(attrs.get(keys::BRAND), Some("Example Corp Waypoint Inns"));
    assert_eq!(
        retriever.requests()[0].filter,
        Some(SourceFilter::brand_prefix("kb-docs", "/waypoint-inns"))
    );
}

/// Test that the "Any" brand searches the whole bucket
#[tokio::test]
async fn test_any_brand_searches_whole_bucket() {
    let model = ScriptedModel::new(&["Several properties have pools."]);
    let retriever = StubRetriever::with_evidence("Pools.\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever.clone(), Some("kb-docs")),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    let request = TurnRequest::new("GeneralQuestion", "Which hotels have a pool?").with_brand_slot(
        BrandSlot {
            original_value: Some("any".to_string()),
            interpreted_value: Some("Any".to_string()),
        },
    );
    let outcome = orchestrator.answer(&request, &mut attrs).await;

    assert_eq!(outcome.question, "Which hotels have a pool?");
    assert_eq!(
        retriever.requests()[0].filter,
        Some(SourceFilter::brand_prefix("kb-docs", ""))
    );
}

// =============================================================================
// Failures
// =============================================================================

/// Test that an unknown model falls back to the default agent
#[tokio::test]
async fn test_unknown_model_uses_default() {
    let model = ScriptedModel::new(&["The spa opens at 9am."]);
    let retriever = StubRetriever::with_evidence("Spa hours start at 9am.\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model.clone(), retriever.clone(), None),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    attrs.set(keys::RAG_LLM, "GPT Nine");
    let outcome = orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "When does the spa open?"), &mut attrs)
        .await;

    assert_eq!(outcome.answer, "The spa opens at 9am.");
    assert_eq!(model.prompts().len(), 1);
    assert_eq!(retriever.requests().len(), 1);
    assert_eq!(attrs.get(keys::RAG_LLM), Some("Scripted"));
    assert_eq!(attrs.get(keys::RAG_MODEL_ID), Some("test.scripted-v1"));
    assert_eq!(attrs.get(keys::PROMPT_ID), Some("GeneralQuestion-LLM-Response"));
}

/// Test that a model transport failure becomes the generic apology
#[tokio::test]
async fn test_model_failure_is_generic_apology() {
    let model = ScriptedModel::failing();
    let retriever = StubRetriever::with_evidence("Pool hours are 7am to 10pm.\n");
    let queue = RecordingQueue::new(false);
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever, None),
        OrchestratorConfig::default(),
    )
    .with_queue(queue.clone());

    let mut attrs = session();
    let outcome = orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "Pool hours?"), &mut attrs)
        .await;

    assert_eq!(outcome.answer, GENERIC_FAILURE);
    assert_eq!(attrs.get(keys::PROMPT_ID), Some("GeneralQuestion-LLM-Error"));
    assert!(attrs.get(keys::CONVERSATION).is_none());
    assert!(queue.jobs.lock().is_empty());
}

// =============================================================================
// Labeled test turns
// =============================================================================

/// Test that labeled turns are evaluated and checked against the evidence
#[tokio::test]
async fn test_labeled_checks() {
    let model = ScriptedModel::new(&[
        "Answer: YES\nBoth give the same hours.",
        "CORRECT\nThe answer matches the document.",
    ]);
    let retriever = StubRetriever::with_evidence("unused\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model, retriever, None),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    attrs.set(keys::GROUND_TRUTH, "The pool is open 7am to 10pm.");
    orchestrator
        .run_labeled_checks(
            &mut attrs,
            "What are the pool hours?",
            "The pool is open from 7am to 10pm.",
            Some("Pool hours are 7am to 10pm daily.\n"),
        )
        .await;

    assert_eq!(attrs.get(keys::EVALUATION_RESULT), Some("PASSED"));
    assert_eq!(attrs.get(keys::EVALUATION_DETAILS), Some("Both give the same hours."));
    assert_eq!(attrs.get(keys::EVALUATION_MODEL_ID), Some("test.scripted-v1"));
    assert_eq!(attrs.get(keys::DETECTION_RESULT), Some("CORRECT"));
    assert_eq!(attrs.get(keys::DETECTION_LATENCY), Some("250"));
}

/// Test that a labeled turn with nothing retrieved is still checked against the no-information text
#[tokio::test]
async fn test_labeled_checks_after_empty_retrieval() {
    let model = ScriptedModel::new(&[
        "I don't know the spa hours.",
        "Answer: NO\nThe answer gives no hours.",
        "CORRECT\nThe document has no information.",
    ]);
    let retriever = StubRetriever::failing();
    let orchestrator = TurnOrchestrator::new(
        registry(model.clone(), retriever, None),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    attrs.set(keys::GROUND_TRUTH, "The spa opens at 9am.");
    let outcome = orchestrator
        .answer(&TurnRequest::new("GeneralQuestion", "When does the spa open?"), &mut attrs)
        .await;
    orchestrator
        .run_labeled_checks(&mut attrs, &outcome.question, &outcome.answer, outcome.evidence.as_deref())
        .await;

    assert_eq!(outcome.evidence.as_deref(), Some(NO_INFORMATION));
    assert_eq!(model.prompts().len(), 3);
    assert!(model.prompts()[2].contains(NO_INFORMATION));
    assert_eq!(attrs.get(keys::EVALUATION_RESULT), Some("FAILED"));
    assert_eq!(attrs.get(keys::DETECTION_RESULT), Some("CORRECT"));
}

/// Test that turns without a ground truth or evidence skip the checks
#[tokio::test]
async fn test_labeled_checks_skipped() {
    let model = ScriptedModel::new(&["Answer: NO\nDifferent."]);
    let retriever = StubRetriever::with_evidence("unused\n");
    let orchestrator = TurnOrchestrator::new(
        registry(model.clone(), retriever, None),
        OrchestratorConfig::default(),
    );

    let mut attrs = session();
    orchestrator.run_labeled_checks(&mut attrs, "q", "a", Some("e")).await;
    assert!(model.prompts().is_empty());
    assert!(attrs.get(keys::EVALUATION_RESULT).is_none());

    attrs.set(keys::GROUND_TRUTH, "truth");
    orchestrator.run_labeled_checks(&mut attrs, "q", "a", None).await;
    assert_eq!(model.prompts().len(), 1);
    assert_eq!(attrs.get(keys::EVALUATION_RESULT), Some("FAILED"));
    assert!(attrs.get(keys::DETECTION_RESULT).is_none());
}

// =============================================================================
// Batch verification
// =============================================================================

/// Test that only undecodable or failed records are reported back
#[tokio::test]
async fn test_batch_reports_itemized_failures() {
    let model = ScriptedModel::new(&["HALLUCINATED\nCheckout is at 11am, not noon."]);
    let agent = Arc::new(ConversationalAgent::new(model, Arc::new(TemplateTable::standard())));
    let processor = VerificationProcessor::new(agent, 2);

    let job = VerificationJob::new(
        serde_json::json!({}),
        "What time is checkout?",
        "Checkout is at noon.",
        "Checkout is at 11am.\n",
    );
    let records = vec![
        QueueRecord {
            message_id: "m-1".to_string(),
            body: serde_json::to_string(&job).unwrap(),
        },
        QueueRecord {
            message_id: "m-2".to_string(),
            body: "not json".to_string(),
        },
        QueueRecord {
            message_id: "m-3".to_string(),
            body: serde_json::to_string(&job).unwrap(),
        },
    ];

    let response = processor.process_batch(records).await;
    let failed: Vec<&str> = response
        .batch_item_failures
        .iter()
        .map(|f| f.item_identifier.as_str())
        .collect();
    assert_eq!(failed, vec!["m-2"]);
}

/// Test that a model failure marks every record for redelivery
#[tokio::test]
async fn test_batch_model_failure() {
    let agent = Arc::new(ConversationalAgent::new(
        ScriptedModel::failing(),
        Arc::new(TemplateTable::standard()),
    ));
    let processor = VerificationProcessor::new(agent, 4);

    let body = serde_json::to_string(&VerificationJob::new(serde_json::json!({}), "q", "a", "c")).unwrap();
    let records = (1..=3)
        .map(|i| QueueRecord {
            message_id: format!("m-{}", i),
            body: body.clone(),
        })
        .collect();

    let response = processor.process_batch(records).await;
    let failed: Vec<&str> = response
        .batch_item_failures
        .iter()
        .map(|f| f.item_identifier.as_str())
        .collect();
    assert_eq!(failed, vec!["m-1", "m-2", "m-3"]);
}
