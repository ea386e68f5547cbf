//! Canonical turns → `/api/chat` request

use serde_json::Value;

use super::types::{OllamaChatRequest, OllamaMessage, OllamaOptions};
use crate::error::LlmError;
use crate::types::{ChatTurn, ContentPart, Role};

/// Sampling settings fixed at session creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub system_instruction: Option<String>,
}

fn to_message(turn: &ChatTurn) -> Result<OllamaMessage, LlmError> {
    let mut content = String::new();
    let mut images = Vec::new();
    for part in &turn.parts {
        match part {
            ContentPart::Text { text } => content.push_str(text),
            ContentPart::InlineData { data, .. } if part.is_image() => images.push(data.clone()),
            ContentPart::InlineData { mime_type, .. } => {
                return Err(LlmError::UnsupportedOperation(format!(
                    "Ollama backend does not support {mime_type} input"
                )));
            }
        }
    }
    Ok(OllamaMessage {
        role: turn.role.as_str().to_string(),
        content,
        images,
    })
}

/// Build a chat request; audio parts are rejected.
pub fn build_chat_request(
    turns: &[ChatTurn],
    settings: &ChatSettings,
    format: Option<Value>,
    stream: bool,
) -> Result<OllamaChatRequest, LlmError> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if let Some(system) = &settings.system_instruction {
        messages.push(OllamaMessage {
            role: Role::System.as_str().to_string(),
            content: system.clone(),
            images: Vec::new(),
        });
    }
    for turn in turns {
        messages.push(to_message(turn)?);
    }
    Ok(OllamaChatRequest {
        model: settings.model.clone(),
        messages,
        stream,
        options: OllamaOptions {
            temperature: Some(settings.temperature),
            top_k: Some(settings.top_k),
            num_predict: None,
        },
        format,
    })
}
