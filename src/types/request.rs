//! Requests and results exchanged between a session and its backend

use serde_json::Value;

use super::{ChatTurn, ExpectedInput};

/// Options a backend sees when creating its provider session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub temperature: f32,
    pub top_k: u32,
    /// System prompts merged with newlines
    pub system_instruction: Option<String>,
    /// Session-level structured-output constraint (standard JSON Schema)
    pub response_constraint: Option<Value>,
    pub expected_inputs: Vec<ExpectedInput>,
    pub expected_outputs: Vec<ExpectedInput>,
}

/// One generation call: the full conversation plus the constraint in force.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub turns: Vec<ChatTurn>,
    pub response_constraint: Option<Value>,
}

impl GenerateRequest {
    pub fn new(turns: Vec<ChatTurn>) -> Self {
        Self {
            turns,
            response_constraint: None,
        }
    }

    pub fn with_response_constraint(mut self, schema: Option<Value>) -> Self {
        self.response_constraint = schema;
        self
    }
}

/// Result of a non-streaming generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    /// Prompt tokens reported by the provider, when it reports them
    pub usage_tokens: Option<u64>,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage_tokens: None,
        }
    }

    pub fn with_usage(mut self, tokens: u64) -> Self {
        self.usage_tokens = Some(tokens);
        self
    }
}
