//! Polyfill configuration
//!
//! Which backends exist and how to reach them. Loaded from JSON or from
//! the environment; explicit values win over environment values via
//! [`PolyfillConfig::merge`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Backend identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "ollama")]
    Ollama,
}

impl BackendKind {
    /// Selection order when no backend is preferred.
    pub const PRIORITY: [Self; 3] = [Self::Gemini, Self::OpenAi, Self::Ollama];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(LlmError::ConfigurationError(format!(
                "Unknown backend: {other}. Valid options: gemini, openai, ollama"
            ))),
        }
    }
}

fn redact(key: &Option<String>) -> Option<&'static str> {
    key.as_ref().map(|_| "[REDACTED]")
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
}

impl fmt::Debug for GeminiSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSection")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiSection {
    fn merge(self, other: Self) -> Self {
        Self {
            api_key: self.api_key.or(other.api_key),
            model: self.model.or(other.model),
            base_url: self.base_url.or(other.base_url),
            timeout: self.timeout.or(other.timeout),
        }
    }

    #[cfg(feature = "google")]
    pub fn to_config(&self) -> crate::providers::gemini::GeminiConfig {
        let mut config =
            crate::providers::gemini::GeminiConfig::new(self.api_key.clone().unwrap_or_default());
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub audio_model: Option<String>,
    pub timeout: Option<u64>,
}

impl fmt::Debug for OpenAiSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSection")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("audio_model", &self.audio_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiSection {
    fn merge(self, other: Self) -> Self {
        Self {
            api_key: self.api_key.or(other.api_key),
            base_url: self.base_url.or(other.base_url),
            model: self.model.or(other.model),
            audio_model: self.audio_model.or(other.audio_model),
            timeout: self.timeout.or(other.timeout),
        }
    }

    #[cfg(feature = "openai")]
    pub fn to_config(&self) -> crate::providers::openai::OpenAiConfig {
        let mut config =
            crate::providers::openai::OpenAiConfig::new(self.api_key.clone().unwrap_or_default());
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(audio_model) = &self.audio_model {
            config = config.with_audio_model(audio_model.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OllamaSection {
    #[serde(alias = "baseUrl")]
    pub host: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<u64>,
}

impl OllamaSection {
    fn merge(self, other: Self) -> Self {
        Self {
            host: self.host.or(other.host),
            model: self.model.or(other.model),
            timeout: self.timeout.or(other.timeout),
        }
    }

    #[cfg(feature = "ollama")]
    pub fn to_config(&self) -> crate::providers::ollama::OllamaConfig {
        let mut config = crate::providers::ollama::OllamaConfig::new();
        if let Some(host) = &self.host {
            config = config.with_base_url(host.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

fn merge_sections<T>(explicit: Option<T>, fallback: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (explicit, fallback) {
        (Some(a), Some(b)) => Some(merge(a, b)),
        (a, b) => a.or(b),
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolyfillConfig {
    /// Preferred backend; otherwise the first configured one by priority
    pub backend: Option<BackendKind>,
    pub gemini: Option<GeminiSection>,
    pub openai: Option<OpenAiSection>,
    pub ollama: Option<OllamaSection>,
    /// Input quota applied to sessions created through the registry
    pub input_quota: Option<u64>,
}

impl PolyfillConfig {
    pub fn from_json_str(json: &str) -> Result<Self, LlmError> {
        serde_json::from_str(json)
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid polyfill config: {e}")))
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            LlmError::ConfigurationError(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini = GeminiSection {
            api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            model: var("GEMINI_MODEL"),
            ..Default::default()
        };
        let openai = OpenAiSection {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL"),
            model: var("OPENAI_MODEL"),
            ..Default::default()
        };
        let ollama = OllamaSection {
            host: var("OLLAMA_HOST"),
            model: var("OLLAMA_MODEL"),
            ..Default::default()
        };
        let backend = var("PROMPT_POLYFILL_BACKEND")
            .map(|b| b.parse())
            .transpose()?;

        Ok(Self {
            backend,
            gemini: (gemini != GeminiSection::default()).then_some(gemini),
            openai: (openai != OpenAiSection::default()).then_some(openai),
            ollama: (ollama != OllamaSection::default()).then_some(ollama),
            input_quota: None,
        })
    }

    /// Field-wise merge; values in `self` win.
    pub fn merge(self, fallback: Self) -> Self {
        Self {
            backend: self.backend.or(fallback.backend),
            gemini: merge_sections(self.gemini, fallback.gemini, GeminiSection::merge),
            openai: merge_sections(self.openai, fallback.openai, OpenAiSection::merge),
            ollama: merge_sections(self.ollama, fallback.ollama, OllamaSection::merge),
            input_quota: self.input_quota.or(fallback.input_quota),
        }
    }

    /// Whether a backend has enough configuration to be built.
    pub fn is_configured(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Gemini => self.gemini.as_ref().is_some_and(|g| g.api_key.is_some()),
            BackendKind::OpenAi => self.openai.as_ref().is_some_and(|o| o.api_key.is_some()),
            BackendKind::Ollama => self.ollama.is_some(),
        }
    }

    /// Configured backends, preferred one first, then by priority.
    pub fn backend_order(&self) -> Vec<BackendKind> {
        let mut order: Vec<BackendKind> = self.backend.into_iter().collect();
        order.extend(
            BackendKind::PRIORITY
                .into_iter()
                .filter(|kind| Some(*kind) != self.backend && self.is_configured(*kind)),
        );
        order
    }
}
