//! Canonical turns → Chat Completions request body

use serde_json::{Value, json};

use crate::error::LlmError;
use crate::schema::StrictSchema;
use crate::types::{ChatTurn, ContentPart, Modalities, Role};

pub const MIXED_MODALITIES_MESSAGE: &str = "OpenAI backend does not support mixing images and audio in the same session. Please start a new session.";

/// Body plus whether the response needs unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub model: String,
    pub body: Value,
    pub wrapped: bool,
}

/// Route a request to a model. Audio goes to the audio model.
///
/// Images and audio cannot be mixed, and structured output is unavailable
/// on the audio model.
pub fn select_model<'a>(
    turns: &[ChatTurn],
    model: &'a str,
    audio_model: &'a str,
    constrained: bool,
) -> Result<&'a str, LlmError> {
    let modalities = Modalities::of(turns);
    if modalities.image && modalities.audio {
        return Err(LlmError::UnsupportedOperation(
            MIXED_MODALITIES_MESSAGE.to_string(),
        ));
    }
    if !modalities.audio {
        return Ok(model);
    }
    if constrained {
        return Err(LlmError::UnsupportedOperation(format!(
            "The audio model {audio_model} does not support structured output (responseConstraint)"
        )));
    }
    Ok(audio_model)
}

/// `input_audio.format` for a mime type. Chat Completions only accepts wav
/// and mp3.
fn audio_format(mime_type: &str) -> Result<&'static str, LlmError> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Ok("wav"),
        "audio/mpeg" | "audio/mp3" => Ok("mp3"),
        other => Err(LlmError::UnsupportedOperation(format!(
            "OpenAI backend does not support {other} audio input; use WAV or MP3"
        ))),
    }
}

fn content_part(part: &ContentPart) -> Result<Value, LlmError> {
    Ok(match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::InlineData { mime_type, data } if part.is_audio() => json!({
            "type": "input_audio",
            "input_audio": {"data": data, "format": audio_format(mime_type)?}
        }),
        ContentPart::InlineData { mime_type, data } => json!({
            "type": "image_url",
            "image_url": {"url": format!("data:{mime_type};base64,{data}")}
        }),
    })
}

fn message(turn: &ChatTurn) -> Result<Value, LlmError> {
    let role = match turn.role {
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::User => "user",
    };
    let text_only = turn.parts.iter().all(|p| p.as_text().is_some());
    if text_only || turn.role == Role::Assistant {
        return Ok(json!({"role": role, "content": turn.text()}));
    }
    let content = turn
        .parts
        .iter()
        .map(content_part)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({"role": role, "content": content}))
}

/// Full `messages` array: system instruction first, then the turns.
pub fn build_messages(
    turns: &[ChatTurn],
    system_instruction: Option<&str>,
) -> Result<Vec<Value>, LlmError> {
    system_instruction
        .map(|text| Ok(json!({"role": "system", "content": text})))
        .into_iter()
        .chain(turns.iter().map(message))
        .collect()
}

/// Assemble a chat completions body for `model`.
pub fn build_body(
    model: &str,
    turns: &[ChatTurn],
    system_instruction: Option<&str>,
    temperature: f32,
    strict: Option<&StrictSchema>,
    audio: bool,
    stream: bool,
) -> Result<Value, LlmError> {
    let mut body = json!({
        "model": model,
        "messages": build_messages(turns, system_instruction)?,
        "temperature": temperature,
    });
    if audio {
        body["modalities"] = json!(["text"]);
    }
    if let Some(strict) = strict {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "response",
                "strict": true,
                "schema": strict.schema,
            }
        });
    }
    if stream {
        body["stream"] = json!(true);
    }
    Ok(body)
}
