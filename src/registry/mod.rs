//! Backend registry
//!
//! Applications register backend adapters (or build them from a
//! [`PolyfillConfig`]) and create sessions through the registry instead
//! of relying on any global installation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{BackendKind, PolyfillConfig};
use crate::error::LlmError;
use crate::session::LanguageModel;
use crate::traits::BackendAdapter;
use crate::types::{Availability, AvailabilityOptions, CreateOptions, ModelParams};

/// Adapters by provider id plus the default one
#[derive(Debug, Default, Clone)]
pub struct BackendRegistry {
    by_id: HashMap<String, Arc<dyn BackendAdapter>>,
    /// Registration order
    order: Vec<String>,
    default_id: Option<String>,
    input_quota: Option<u64>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its provider id. The first adapter
    /// registered becomes the default.
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) -> &mut Self {
        let id = adapter.provider_id().to_string();
        if !self.by_id.contains_key(&id) {
            self.order.push(id.clone());
        }
        if self.default_id.is_none() {
            self.default_id = Some(id.clone());
        }
        debug!(backend = %id, "registered backend");
        self.by_id.insert(id, adapter);
        self
    }

    pub fn with_backend(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn set_default(&mut self, id: &str) -> Result<(), LlmError> {
        if !self.by_id.contains_key(id) {
            return Err(LlmError::ConfigurationError(format!(
                "Backend {id} is not registered"
            )));
        }
        self.default_id = Some(id.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn BackendAdapter>> {
        self.by_id.get(id).cloned()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    pub fn default_backend(&self) -> Result<Arc<dyn BackendAdapter>, LlmError> {
        self.default_id
            .as_deref()
            .and_then(|id| self.get(id))
            .ok_or_else(|| LlmError::ConfigurationError("No backend is configured".to_string()))
    }

    fn resolve(&self, id: &str) -> Result<Arc<dyn BackendAdapter>, LlmError> {
        self.get(id).ok_or_else(|| {
            LlmError::ConfigurationError(format!("Backend {id} is not registered"))
        })
    }

    /// Build every configured backend, preferred (or highest priority)
    /// first so it becomes the default.
    pub fn from_config(config: &PolyfillConfig) -> Result<Self, LlmError> {
        let mut registry = Self {
            input_quota: config.input_quota,
            ..Self::default()
        };
        for kind in config.backend_order() {
            registry.register(build_backend(config, kind)?);
        }
        Ok(registry)
    }

    /// Availability of the default backend; no backend means unavailable.
    pub async fn availability(&self, options: &AvailabilityOptions) -> Availability {
        match self.default_backend() {
            Ok(backend) => LanguageModel::availability(backend.as_ref(), options).await,
            Err(_) => Availability::Unavailable,
        }
    }

    pub fn params(&self) -> Result<ModelParams, LlmError> {
        Ok(LanguageModel::params(self.default_backend()?.as_ref()))
    }

    /// Create a session on the default backend.
    pub async fn create(&self, options: CreateOptions) -> Result<LanguageModel, LlmError> {
        let backend = self.default_backend()?;
        LanguageModel::create(backend, self.apply_defaults(options)).await
    }

    /// Create a session on a specific backend.
    pub async fn create_with(
        &self,
        id: &str,
        options: CreateOptions,
    ) -> Result<LanguageModel, LlmError> {
        let backend = self.resolve(id)?;
        LanguageModel::create(backend, self.apply_defaults(options)).await
    }

    fn apply_defaults(&self, mut options: CreateOptions) -> CreateOptions {
        if options.input_quota.is_none() {
            options.input_quota = self.input_quota;
        }
        options
    }
}

/// Build one backend from its config section.
pub fn build_backend(
    config: &PolyfillConfig,
    kind: BackendKind,
) -> Result<Arc<dyn BackendAdapter>, LlmError> {
    let missing = || LlmError::ConfigurationError(format!("Backend {kind} is not configured"));
    match kind {
        #[cfg(feature = "google")]
        BackendKind::Gemini => {
            let section = config.gemini.as_ref().ok_or_else(missing)?;
            Ok(Arc::new(crate::providers::gemini::GeminiAdapter::new(
                section.to_config(),
            )?))
        }
        #[cfg(feature = "openai")]
        BackendKind::OpenAi => {
            let section = config.openai.as_ref().ok_or_else(missing)?;
            Ok(Arc::new(crate::providers::openai::OpenAiAdapter::new(
                section.to_config(),
            )?))
        }
        #[cfg(feature = "ollama")]
        BackendKind::Ollama => {
            let section = config.ollama.as_ref().ok_or_else(missing)?;
            Ok(Arc::new(crate::providers::ollama::OllamaAdapter::new(
                section.to_config(),
            )?))
        }
        #[allow(unreachable_patterns)]
        _ => Err(LlmError::ConfigurationError(format!(
            "Backend {kind} is not enabled in this build"
        ))),
    }
}

#[cfg(all(test, feature = "all-providers"))]
mod tests {
    use super::*;

    #[test]
    fn config_order_sets_the_default() {
        let config = PolyfillConfig::from_json_str(
            r#"{"openai": {"apiKey": "sk"}, "ollama": {}, "inputQuota": 100}"#,
        )
        .unwrap();
        let registry = BackendRegistry::from_config(&config).unwrap();
        assert_eq!(registry.ids(), ["openai", "ollama"]);
        assert_eq!(registry.default_id(), Some("openai"));
        assert_eq!(registry.apply_defaults(CreateOptions::new()).input_quota, Some(100));
    }

    #[test]
    fn unknown_default_is_rejected() {
        let mut registry = BackendRegistry::new();
        assert!(registry.set_default("gemini").is_err());
        assert!(registry.default_backend().is_err());
    }

    #[tokio::test]
    async fn empty_registry_is_unavailable() {
        let registry = BackendRegistry::new();
        assert_eq!(
            registry.availability(&AvailabilityOptions::default()).await,
            Availability::Unavailable
        );
        assert!(registry.create(CreateOptions::new()).await.is_err());
    }
}
