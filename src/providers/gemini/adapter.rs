use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::GeminiConfig;
use super::convert::GenerationSettings;
use super::session::GeminiSession;
use crate::error::LlmError;
use crate::schema::to_gemini_schema;
use crate::traits::{BackendAdapter, ProviderSession};
use crate::types::{Availability, AvailabilityOptions, ModelParams, SessionConfig};
use crate::utils::http::build_http_client;

/// Gemini backend (cloud multimodal: text, image and audio in one session)
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    config: Arc<GeminiConfig>,
    http_client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: GeminiConfig, http_client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl BackendAdapter for GeminiAdapter {
    fn provider_id(&self) -> &str {
        "gemini"
    }

    fn params(&self) -> ModelParams {
        ModelParams {
            default_temperature: 1.0,
            max_temperature: 2.0,
            default_top_k: 64,
            max_top_k: 64,
        }
    }

    async fn availability(&self, _options: &AvailabilityOptions) -> Availability {
        if self.config.has_api_key() {
            Availability::Available
        } else {
            warn!("gemini backend has no API key configured");
            Availability::Unavailable
        }
    }

    async fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ProviderSession>, LlmError> {
        if !self.config.has_api_key() {
            return Err(LlmError::ConfigurationError(
                "Gemini API key is not configured".to_string(),
            ));
        }
        let default_schema = match &config.response_constraint {
            Some(schema) => Some((schema.clone(), to_gemini_schema(schema).to_value()?)),
            None => None,
        };
        debug!(model = %self.config.model, "creating gemini session");
        Ok(Arc::new(GeminiSession::new(
            self.config.clone(),
            self.http_client.clone(),
            GenerationSettings {
                temperature: config.temperature,
                top_k: config.top_k,
                system_instruction: config.system_instruction.clone(),
            },
            default_schema,
        )))
    }
}
