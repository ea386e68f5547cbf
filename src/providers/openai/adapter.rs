use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::OpenAiConfig;
use super::session::OpenAiSession;
use crate::error::LlmError;
use crate::schema::to_strict_json_schema;
use crate::traits::{BackendAdapter, ProviderSession};
use crate::types::{Availability, AvailabilityOptions, InputType, SessionConfig};
use crate::utils::http::build_http_client;

/// OpenAI-compatible chat completions backend
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    config: Arc<OpenAiConfig>,
    http_client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: OpenAiConfig, http_client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
        }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl BackendAdapter for OpenAiAdapter {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn availability(&self, options: &AvailabilityOptions) -> Availability {
        if !self.config.has_api_key() {
            warn!("openai backend has no API key configured");
            return Availability::Unavailable;
        }
        if options.expects(InputType::Image) && options.expects(InputType::Audio) {
            debug!("openai backend cannot mix image and audio inputs");
            return Availability::Unavailable;
        }
        Availability::Available
    }

    async fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ProviderSession>, LlmError> {
        if !self.config.has_api_key() {
            return Err(LlmError::ConfigurationError(
                "OpenAI API key is not configured".to_string(),
            ));
        }
        let default_schema = config
            .response_constraint
            .as_ref()
            .map(|schema| (schema.clone(), to_strict_json_schema(schema)));
        debug!(model = %self.config.model, audio_model = %self.config.audio_model, "creating openai session");
        Ok(Arc::new(OpenAiSession::new(
            self.config.clone(),
            self.http_client.clone(),
            config.temperature,
            config.system_instruction.clone(),
            default_schema,
        )))
    }
}
