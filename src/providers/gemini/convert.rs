//! Canonical turns ↔ Gemini request/response (pure functions)

use serde_json::Value;

use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::error::LlmError;
use crate::types::{ChatTurn, ContentPart, Role};

/// Sampling settings fixed at session creation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub system_instruction: Option<String>,
}

fn to_part(part: &ContentPart) -> Part {
    match part {
        ContentPart::Text { text } => Part::Text {
            text: text.clone(),
            thought: None,
        },
        ContentPart::InlineData { mime_type, data } => Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            },
        },
    }
}

/// Convert one turn; assistant turns use Gemini's `model` role.
pub fn to_gemini_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    };
    Content {
        role: Some(role.to_string()),
        parts: turn.parts.iter().map(to_part).collect(),
    }
}

pub fn to_gemini_contents(turns: &[ChatTurn]) -> Vec<Content> {
    turns.iter().map(to_gemini_content).collect()
}

/// Build a `generateContent` body. `response_schema` is already in
/// Gemini's native form.
pub fn build_generate_request(
    turns: &[ChatTurn],
    settings: &GenerationSettings,
    response_schema: Option<Value>,
) -> GenerateContentRequest {
    let response_mime_type = response_schema
        .as_ref()
        .map(|_| "application/json".to_string());
    GenerateContentRequest {
        contents: to_gemini_contents(turns),
        system_instruction: settings.system_instruction.as_ref().map(|text| Content {
            role: None,
            parts: vec![Part::Text {
                text: text.clone(),
                thought: None,
            }],
        }),
        generation_config: Some(GenerationConfig {
            temperature: Some(f64::from(settings.temperature)),
            top_k: Some(settings.top_k),
            response_mime_type,
            response_schema,
        }),
    }
}

/// Concatenated visible text of the first candidate.
pub fn candidate_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { text, thought } if *thought != Some(true) => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Text of a non-streaming response; a blocked prompt is a provider error.
pub fn response_text(response: &GenerateContentResponse) -> Result<String, LlmError> {
    if response.candidates.is_empty() {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.get("blockReason"))
            .and_then(Value::as_str)
            .unwrap_or("no candidates returned");
        return Err(LlmError::provider_error(
            "gemini",
            format!("Generation failed: {reason}"),
        ));
    }
    Ok(candidate_text(response))
}
