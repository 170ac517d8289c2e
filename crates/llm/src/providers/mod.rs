//! Provider request/response formats
//!
//! Each provider family accepts its own JSON body and returns its own
//! envelope. A format builds the body from a prompt and merged parameters
//! and pulls the predicted text back out; transport lives in the adapter.

mod ai21;
mod amazon;
mod anthropic;
mod cohere;
mod meta;
mod mistral;

pub use ai21::{JambaFormat, JurassicFormat};
pub use amazon::TitanFormat;
pub use anthropic::{AnthropicCompletionFormat, AnthropicMessagesFormat};
pub use cohere::{CohereCommandFormat, CohereCommandRFormat};
pub use meta::LlamaFormat;
pub use mistral::MistralFormat;

use concierge_core::{GenerationParams, PromptInput};
use serde::de::DeserializeOwned;

use crate::LlmError;

/// Wire format of one provider family
pub trait ProviderFormat: Send + Sync + 'static {
    /// Family name for logging
    fn family(&self) -> &'static str;

    /// Provider defaults, applied under the model descriptor's parameters
    fn defaults(&self) -> GenerationParams;

    /// Build the request body
    fn build_request(
        &self,
        prompt: &PromptInput,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, LlmError>;

    /// Predicted text, if the response carries any
    fn extract_prediction(&self, body: &serde_json::Value) -> Option<String>;
}

/// Decode a response envelope, treating shape mismatches as "no prediction"
fn decode<T: DeserializeOwned>(body: &serde_json::Value) -> Option<T> {
    match serde_json::from_value(body.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!(error = %e, "Unexpected response envelope");
            None
        }
    }
}
