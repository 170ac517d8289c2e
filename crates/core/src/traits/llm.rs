//! Language model traits

use crate::{GenerationParams, InvocationResult, PromptInput, Result};
use async_trait::async_trait;

/// Text-completion model behind a provider-specific wire format
///
/// Implementations:
/// - one type per provider family in `concierge-llm`
///
/// # Example
///
/// ```ignore
/// let model: Arc<dyn ModelInvoker> = create_invoker(&descriptor, &endpoint)?;
/// let result = model.invoke(&prompt, &GenerationParams::default()).await?;
/// println!("{} ({} ms)", result.prediction, result.invocation_time_ms);
/// ```
#[async_trait]
pub trait ModelInvoker: Send + Sync + 'static {
    /// Invoke the model once
    ///
    /// A response without a usable prediction is not an error: the result
    /// carries a placeholder prediction and `error` is set. Transport and
    /// service failures return `Err`.
    async fn invoke(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<InvocationResult>;

    /// Provider model identifier
    fn model_id(&self) -> &str;

    /// Display name for logging
    fn name(&self) -> &str;
}
