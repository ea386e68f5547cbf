//! Content conversion
//!
//! Turns caller-supplied text and media into canonical [`ContentPart`]s.
//! Every media value becomes exactly one inline-data part.

pub mod audio;
pub mod canvas;

use tracing::debug;

use crate::error::LlmError;
use crate::types::{
    ChatTurn, ContentPart, InputPart, MediaKind, MediaValue, MessageContent, PromptInput,
    PromptMessage, Role,
};
use crate::utils::mime::{
    DEFAULT_AUDIO_MIME, guess_audio_mime, guess_mime_from_path, sniff_image_mime,
};

fn unsupported(kind: MediaKind, value: &MediaValue) -> LlmError {
    LlmError::UnsupportedOperation(format!(
        "Unsupported {} source: a {} cannot be used as {} input",
        kind.as_str(),
        value.shape(),
        kind.as_str()
    ))
}

fn mime_for_bytes(kind: MediaKind, bytes: &[u8]) -> String {
    match kind {
        MediaKind::Image => sniff_image_mime(bytes).to_string(),
        MediaKind::Audio => guess_audio_mime(bytes),
    }
}

/// Convert one media value, tagged with its declared type, to inline data.
pub async fn convert_media(kind: MediaKind, value: &MediaValue) -> Result<ContentPart, LlmError> {
    match value {
        MediaValue::Blob(blob) => {
            let mime = if blob.mime_type.is_empty() {
                mime_for_bytes(kind, &blob.bytes)
            } else {
                blob.mime_type.clone()
            };
            Ok(ContentPart::from_bytes(mime, &blob.bytes))
        }
        MediaValue::Bytes(bytes) => Ok(ContentPart::from_bytes(mime_for_bytes(kind, bytes), bytes)),
        MediaValue::File(path) => {
            let bytes = tokio::fs::read(path).await?;
            let mime = guess_mime_from_path(path)
                .filter(|m| m.starts_with(kind.as_str()))
                .unwrap_or_else(|| mime_for_bytes(kind, &bytes));
            debug!(path = %path.display(), mime = %mime, len = bytes.len(), "read media file");
            Ok(ContentPart::from_bytes(mime, &bytes))
        }
        MediaValue::Drawable(source) => match kind {
            MediaKind::Image => {
                let png = canvas::render_to_png(source.as_ref())?;
                Ok(ContentPart::from_bytes("image/png", &png))
            }
            MediaKind::Audio => Err(unsupported(kind, value)),
        },
        MediaValue::AudioSamples(buffer) => match kind {
            MediaKind::Audio => {
                let wav = audio::encode_wav(buffer)?;
                Ok(ContentPart::from_bytes(DEFAULT_AUDIO_MIME, &wav))
            }
            MediaKind::Image => Err(unsupported(kind, value)),
        },
    }
}

/// Convert message content into canonical parts.
pub async fn convert_message_content(
    content: &MessageContent,
) -> Result<Vec<ContentPart>, LlmError> {
    match content {
        MessageContent::Text(text) => Ok(vec![ContentPart::text(text.clone())]),
        MessageContent::Parts(parts) => {
            let mut converted = Vec::with_capacity(parts.len());
            for part in parts {
                converted.push(match part {
                    InputPart::Text(text) => ContentPart::text(text.clone()),
                    InputPart::Image(value) => convert_media(MediaKind::Image, value).await?,
                    InputPart::Audio(value) => convert_media(MediaKind::Audio, value).await?,
                });
            }
            Ok(converted)
        }
    }
}

/// Convert prompt input into the user/assistant turns it contributes.
///
/// System messages are only accepted as initial prompts.
pub async fn convert_prompt_input(input: &PromptInput) -> Result<Vec<ChatTurn>, LlmError> {
    match input {
        PromptInput::Text(text) => Ok(vec![ChatTurn::user(vec![ContentPart::text(text.clone())])]),
        PromptInput::Messages(messages) => {
            if messages.is_empty() {
                return Err(LlmError::InvalidInput(
                    "Prompt input contains no messages".to_string(),
                ));
            }
            let mut turns = Vec::with_capacity(messages.len());
            for message in messages {
                if message.role == Role::System {
                    return Err(LlmError::UnsupportedOperation(
                        "System messages are only supported in initial prompts".to_string(),
                    ));
                }
                let parts = convert_message_content(&message.content).await?;
                turns.push(ChatTurn::new(message.role, parts));
            }
            Ok(turns)
        }
    }
}

/// Initial prompts split into a merged system instruction and the
/// conversational turns that seed history.
#[derive(Debug, Clone, Default)]
pub struct InitialPrompts {
    pub system_instruction: Option<String>,
    pub turns: Vec<ChatTurn>,
}

/// Split initial prompts, merging all system texts with newlines.
pub async fn convert_initial_prompts(
    prompts: &[PromptMessage],
) -> Result<InitialPrompts, LlmError> {
    let mut system_texts = Vec::new();
    let mut turns = Vec::new();
    for message in prompts {
        match message.role {
            Role::System => match &message.content {
                MessageContent::Text(text) => system_texts.push(text.clone()),
                MessageContent::Parts(parts) => {
                    for part in parts {
                        match part {
                            InputPart::Text(text) => system_texts.push(text.clone()),
                            _ => {
                                return Err(LlmError::UnsupportedOperation(
                                    "System prompts only support text content".to_string(),
                                ));
                            }
                        }
                    }
                }
            },
            role => {
                let parts = convert_message_content(&message.content).await?;
                turns.push(ChatTurn::new(role, parts));
            }
        }
    }
    let system_instruction = (!system_texts.is_empty()).then(|| system_texts.join("\n"));
    Ok(InitialPrompts {
        system_instruction,
        turns,
    })
}
