//! Model invoker adapter
//!
//! Bridges a provider wire format and the shared HTTP client to the core
//! `ModelInvoker` trait. Each provider family is a distinct
//! `ProviderAdapter<F>` type behind the same trait.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use concierge_core::{GenerationParams, InvocationResult, ModelInvoker, PromptInput, Result};

use crate::client::InvokeClient;
use crate::providers::ProviderFormat;
use crate::{NO_PREDICTION_ERROR, NO_PREDICTION_TEXT};

/// `ModelInvoker` for one model of a provider family
///
/// # Example
///
/// ```ignore
/// let client = Arc::new(InvokeClient::new(InvokeClientConfig::new(endpoint))?);
/// let model = ProviderAdapter::new(MistralFormat, client, "mistral.mistral-large-2402-v1:0", "Mistral Large");
/// let result = model.invoke(&"Late checkout?".into(), &GenerationParams::default()).await?;
/// ```
pub struct ProviderAdapter<F: ProviderFormat> {
    format: F,
    client: Arc<InvokeClient>,
    model_id: String,
    name: String,
    /// Descriptor parameters layered over the provider defaults
    defaults: GenerationParams,
}

impl<F: ProviderFormat> ProviderAdapter<F> {
    pub fn new(
        format: F,
        client: Arc<InvokeClient>,
        model_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let defaults = format.defaults();
        Self {
            format,
            client,
            model_id: model_id.into(),
            name: name.into(),
            defaults,
        }
    }

    /// Layer model-level parameters over the provider defaults
    pub fn with_params(mut self, params: &GenerationParams) -> Self {
        self.defaults = params.or(&self.format.defaults());
        self
    }

    /// Parameters a call would use
    pub fn effective_params(&self, params: &GenerationParams) -> GenerationParams {
        params.or(&self.defaults)
    }
}

#[async_trait]
impl<F: ProviderFormat> ModelInvoker for ProviderAdapter<F> {
    async fn invoke(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<InvocationResult> {
        let start = Instant::now();
        let params = self.effective_params(params);
        let body = self.format.build_request(prompt, &params)?;

        let raw = match self.client.invoke_model(&self.model_id, &body).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    model = %self.name,
                    model_id = %self.model_id,
                    error = %e,
                    "Model invocation failed"
                );
                return Err(e.into());
            }
        };

        let (prediction, error) =
            normalize_prediction(self.format.extract_prediction(&raw.body));
        let invocation_time_ms = start.elapsed().as_millis() as u64;

        if let Some(error) = &error {
            tracing::error!(model = %self.name, request_id = ?raw.request_id, error = %error, "Empty prediction");
        } else {
            tracing::debug!(
                model = %self.name,
                family = self.format.family(),
                request_id = ?raw.request_id,
                input_tokens = ?raw.input_tokens,
                output_tokens = ?raw.output_tokens,
                elapsed_ms = invocation_time_ms,
                "Model invoked"
            );
        }

        Ok(InvocationResult {
            prompt_text: prompt.to_flat_text(),
            raw_response: raw.body,
            prediction,
            request_id: raw.request_id,
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            invocation_time_ms,
            error,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Normalize an extracted prediction
///
/// Missing or empty text becomes the placeholder with an error marker.
/// Otherwise one leading space or newline is removed.
pub fn normalize_prediction(prediction: Option<String>) -> (String, Option<String>) {
    match prediction.filter(|p| !p.is_empty()) {
        None => (
            NO_PREDICTION_TEXT.to_string(),
            Some(NO_PREDICTION_ERROR.to_string()),
        ),
        Some(text) => {
            let text = match text.strip_prefix(' ').or_else(|| text.strip_prefix('\n')) {
                Some(stripped) => stripped.to_string(),
                None => text,
            };
            (text, None)
        }
    }
}
