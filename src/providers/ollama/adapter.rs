use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::OllamaConfig;
use super::convert::ChatSettings;
use super::session::OllamaSession;
use super::types::OllamaTagsResponse;
use crate::error::LlmError;
use crate::traits::{BackendAdapter, ProviderSession};
use crate::types::{
    Availability, AvailabilityOptions, InputType, ModelParams, SessionConfig,
};
use crate::utils::http::{build_http_client, ensure_success, join_url};

/// Local runtime backend (Ollama). Text and images only.
#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    config: Arc<OllamaConfig>,
    http_client: reqwest::Client,
}

impl OllamaAdapter {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: OllamaConfig, http_client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Installed models, from `/api/tags`.
    pub async fn list_models(&self) -> Result<OllamaTagsResponse, LlmError> {
        let response = self
            .http_client
            .get(join_url(&self.config.base_url, "api/tags"))
            .send()
            .await?;
        Ok(ensure_success("ollama", response).await?.json().await?)
    }
}

#[async_trait]
impl BackendAdapter for OllamaAdapter {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    fn params(&self) -> ModelParams {
        ModelParams {
            default_temperature: 0.8,
            max_temperature: 2.0,
            default_top_k: 40,
            max_top_k: 128,
        }
    }

    async fn availability(&self, options: &AvailabilityOptions) -> Availability {
        if options.expects(InputType::Audio) {
            debug!("ollama backend does not accept audio input");
            return Availability::Unavailable;
        }
        match self.list_models().await {
            Ok(tags) if tags.has_model(&self.config.model) => Availability::Available,
            Ok(_) => Availability::Downloadable,
            Err(e) => {
                warn!(error = %e, base_url = %self.config.base_url, "ollama availability probe failed");
                Availability::Unavailable
            }
        }
    }

    async fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ProviderSession>, LlmError> {
        if config.expected_inputs.iter().any(|e| e.kind == InputType::Audio) {
            return Err(LlmError::UnsupportedOperation(
                "Ollama backend does not support audio input".to_string(),
            ));
        }
        debug!(model = %self.config.model, "creating ollama session");
        Ok(Arc::new(OllamaSession::new(
            self.config.clone(),
            self.http_client.clone(),
            ChatSettings {
                model: self.config.model.clone(),
                temperature: config.temperature,
                top_k: config.top_k,
                system_instruction: config.system_instruction.clone(),
            },
        )))
    }
}
