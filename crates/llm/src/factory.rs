//! LLM Factory
//!
//! Builds a `ModelInvoker` from a model descriptor. All models share one
//! HTTP client; the descriptor's provider kind picks the wire format.
//!
//! ## Example
//! ```ignore
//! let client = Arc::new(InvokeClient::new(InvokeClientConfig::new(&settings.inference.endpoint))?);
//! let model = LlmFactory::create(settings.find_model("Default").unwrap(), client)?;
//! ```

use std::sync::Arc;

use concierge_config::{ModelDescriptor, ProviderKind};
use concierge_core::ModelInvoker;

use crate::adapter::ProviderAdapter;
use crate::client::InvokeClient;
use crate::providers::{
    AnthropicCompletionFormat, AnthropicMessagesFormat, CohereCommandFormat, CohereCommandRFormat,
    JambaFormat, JurassicFormat, LlamaFormat, MistralFormat, ProviderFormat, TitanFormat,
};
use crate::LlmError;

/// Factory for model invokers
pub struct LlmFactory;

impl LlmFactory {
    /// Create the invoker for a descriptor
    pub fn create(
        descriptor: &ModelDescriptor,
        client: Arc<InvokeClient>,
    ) -> Result<Arc<dyn ModelInvoker>, LlmError> {
        if descriptor.model_id.trim().is_empty() {
            return Err(LlmError::Configuration(format!(
                "model '{}' has no model id",
                descriptor.name
            )));
        }

        let invoker: Arc<dyn ModelInvoker> = match descriptor.provider {
            ProviderKind::Anthropic => Self::adapter(AnthropicMessagesFormat, descriptor, client),
            ProviderKind::AnthropicCompletion => {
                Self::adapter(AnthropicCompletionFormat, descriptor, client)
            }
            ProviderKind::AmazonTitan => Self::adapter(TitanFormat, descriptor, client),
            ProviderKind::Ai21Jurassic => Self::adapter(JurassicFormat, descriptor, client),
            ProviderKind::Ai21Jamba => Self::adapter(JambaFormat, descriptor, client),
            ProviderKind::CohereCommand => Self::adapter(CohereCommandFormat, descriptor, client),
            ProviderKind::CohereCommandR => Self::adapter(CohereCommandRFormat, descriptor, client),
            ProviderKind::MetaLlama => Self::adapter(LlamaFormat, descriptor, client),
            ProviderKind::Mistral => Self::adapter(MistralFormat, descriptor, client),
        };

        tracing::debug!(
            model = %descriptor.name,
            model_id = %descriptor.model_id,
            provider = ?descriptor.provider,
            "Model invoker created"
        );

        Ok(invoker)
    }

    fn adapter<F: ProviderFormat>(
        format: F,
        descriptor: &ModelDescriptor,
        client: Arc<InvokeClient>,
    ) -> Arc<dyn ModelInvoker> {
        Arc::new(
            ProviderAdapter::new(format, client, &descriptor.model_id, &descriptor.name)
                .with_params(&descriptor.params),
        )
    }
}
