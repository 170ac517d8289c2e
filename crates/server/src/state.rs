//! Application State
//!
//! Shared state across all handlers. Everything here is built once at
//! startup and never mutated.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use concierge_agent::{OrchestratorConfig, Registry, TurnOrchestrator, VerificationProcessor};
use concierge_config::Settings;
use concierge_core::VerificationQueue;

use crate::dialog::DialogDispatcher;
use crate::queue::build_queue;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<Registry>,
    pub dispatcher: Arc<DialogDispatcher>,
    /// Hallucination checker for queued turns
    pub verifier: Option<Arc<VerificationProcessor>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the registry, queue and orchestrator from settings
    pub fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let registry = Arc::new(Registry::from_settings(&config)?);
        let verifier = verification_processor(&config, &registry);
        let queue = build_queue(&config.queue, verifier.clone())?;
        Ok(Self::new(config, registry, queue, verifier))
    }

    /// Assemble state from prebuilt parts
    pub fn new(
        config: Settings,
        registry: Arc<Registry>,
        queue: Option<Arc<dyn VerificationQueue>>,
        verifier: Option<Arc<VerificationProcessor>>,
    ) -> Self {
        let mut orchestrator =
            TurnOrchestrator::new(registry.clone(), OrchestratorConfig::from_settings(&config));
        if let Some(queue) = queue {
            orchestrator = orchestrator.with_queue(queue);
        }

        let dispatcher = DialogDispatcher::new(Arc::new(orchestrator))
            .with_speech_conversions(config.conversation.speech_conversions.clone())
            .with_defaults(
                &config.conversation.default_model,
                &config.conversation.default_knowledge_base,
            );

        Self {
            config: Arc::new(config),
            registry,
            dispatcher: Arc::new(dispatcher),
            verifier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Processor for the configured verification model, or the default model
fn verification_processor(
    config: &Settings,
    registry: &Registry,
) -> Option<Arc<VerificationProcessor>> {
    let model = config.queue.verification_model.as_deref().unwrap_or_default();
    match registry.agent(model) {
        Some(agent) => Some(Arc::new(VerificationProcessor::new(
            agent,
            config.queue.concurrency,
        ))),
        None => {
            tracing::warn!(model = %model, "Unknown verification model");
            None
        }
    }
}
