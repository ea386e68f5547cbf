//! Option structs for session creation, prompting and cloning

use serde::{Deserialize, Serialize};

use super::PromptMessage;
use crate::utils::cancel::AbortSignal;

/// Result of an availability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
    Downloadable,
    Downloading,
}

impl Availability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Downloadable => "downloadable",
            Self::Downloading => "downloading",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modality of an expected input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Image,
    Audio,
}

/// `{type, languages?}` entry of `expectedInputs`/`expectedOutputs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedInput {
    #[serde(rename = "type")]
    pub kind: InputType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

impl ExpectedInput {
    pub fn new(kind: InputType) -> Self {
        Self {
            kind,
            languages: Vec::new(),
        }
    }

    pub fn text() -> Self {
        Self::new(InputType::Text)
    }

    pub fn image() -> Self {
        Self::new(InputType::Image)
    }

    pub fn audio() -> Self {
        Self::new(InputType::Audio)
    }
}

/// Options accepted by `availability`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityOptions {
    #[serde(default)]
    pub expected_inputs: Vec<ExpectedInput>,
    #[serde(default)]
    pub expected_outputs: Vec<ExpectedInput>,
}

impl AvailabilityOptions {
    pub fn expects(&self, kind: InputType) -> bool {
        self.expected_inputs.iter().any(|e| e.kind == kind)
    }
}

/// Sampling parameter defaults and ceilings reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams {
    pub default_temperature: f32,
    pub max_temperature: f32,
    pub default_top_k: u32,
    pub max_top_k: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            default_temperature: 1.0,
            max_temperature: 2.0,
            default_top_k: 3,
            max_top_k: 128,
        }
    }
}

/// Options for `LanguageModel::create`
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub initial_prompts: Vec<PromptMessage>,
    pub expected_inputs: Vec<ExpectedInput>,
    pub expected_outputs: Vec<ExpectedInput>,
    /// JSON Schema constraining every response of the session
    pub response_constraint: Option<serde_json::Value>,
    pub signal: Option<AbortSignal>,
    /// Overrides the default input quota ceiling
    pub input_quota: Option<u64>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_initial_prompts(mut self, prompts: Vec<PromptMessage>) -> Self {
        self.initial_prompts = prompts;
        self
    }

    pub fn with_expected_inputs(mut self, inputs: Vec<ExpectedInput>) -> Self {
        self.expected_inputs = inputs;
        self
    }

    pub fn with_expected_outputs(mut self, outputs: Vec<ExpectedInput>) -> Self {
        self.expected_outputs = outputs;
        self
    }

    pub fn with_response_constraint(mut self, schema: serde_json::Value) -> Self {
        self.response_constraint = Some(schema);
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_input_quota(mut self, quota: u64) -> Self {
        self.input_quota = Some(quota);
        self
    }

    pub fn availability_options(&self) -> AvailabilityOptions {
        AvailabilityOptions {
            expected_inputs: self.expected_inputs.clone(),
            expected_outputs: self.expected_outputs.clone(),
        }
    }
}

/// Options for `prompt`, `prompt_streaming`, `append` and `measure_input_usage`
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub signal: Option<AbortSignal>,
    /// Overrides the session-level response constraint for this call
    pub response_constraint: Option<serde_json::Value>,
}

impl PromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_response_constraint(mut self, schema: serde_json::Value) -> Self {
        self.response_constraint = Some(schema);
        self
    }
}

/// Options for `LanguageModel::clone_session`
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub signal: Option<AbortSignal>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }
}
