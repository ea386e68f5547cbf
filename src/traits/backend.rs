use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::stream::TextStream;
use crate::types::{
    Availability, AvailabilityOptions, ChatTurn, GenerateRequest, Generation, ModelParams,
    SessionConfig,
};

/// One AI provider behind the session interface.
///
/// Adapters own connection state only (keys, base URL, model names). They
/// never hold conversation data; every call receives the full turn list.
#[async_trait]
pub trait BackendAdapter: Send + Sync + fmt::Debug {
    /// Stable identifier, e.g. `"gemini"`.
    fn provider_id(&self) -> &str;

    /// Default and maximum sampling parameters.
    fn params(&self) -> ModelParams {
        ModelParams::default()
    }

    /// Whether the requested modalities can be served.
    ///
    /// Probe failures are reported as [`Availability::Unavailable`].
    async fn availability(&self, options: &AvailabilityOptions) -> Availability;

    /// Create the provider-side handle for a new session.
    async fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ProviderSession>, LlmError>;
}

/// Provider-specific session handle.
#[async_trait]
pub trait ProviderSession: Send + Sync + fmt::Debug {
    /// Non-streaming generation over the full conversation.
    async fn generate_content(&self, request: GenerateRequest) -> Result<Generation, LlmError>;

    /// Streaming generation. The returned stream is lazy, finite and
    /// consumed once; dropping it releases the underlying connection.
    async fn generate_content_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, LlmError>;

    /// Exact or approximate input token count.
    async fn count_tokens(&self, turns: &[ChatTurn]) -> Result<u64, LlmError>;
}
