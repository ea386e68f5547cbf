//! Canonical conversation content

use serde::{Deserialize, Serialize};

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Model output. Gemini calls this role `model`.
    #[serde(alias = "model")]
    Assistant,
    System,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Canonical unit of conversation content.
///
/// Every non-text input is converted to exactly one `InlineData` part before
/// it enters a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        /// Base64 (standard alphabet, padded) payload
        data: String,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes and wrap them as inline data.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::{Engine, engine::general_purpose::STANDARD};
        Self::inline_data(mime_type, STANDARD.encode(bytes))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineData { .. } => None,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::InlineData { mime_type, .. } => Some(mime_type),
            Self::Text { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type().is_some_and(|m| m.starts_with("image/"))
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type().is_some_and(|m| m.starts_with("audio/"))
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatTurn {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    /// A model turn holding a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn has_image(&self) -> bool {
        self.parts.iter().any(ContentPart::is_image)
    }

    pub fn has_audio(&self) -> bool {
        self.parts.iter().any(ContentPart::is_audio)
    }
}

/// Modalities present across a list of turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modalities {
    pub image: bool,
    pub audio: bool,
}

impl Modalities {
    pub fn of(turns: &[ChatTurn]) -> Self {
        turns.iter().fold(Self::default(), |acc, turn| Self {
            image: acc.image || turn.has_image(),
            audio: acc.audio || turn.has_audio(),
        })
    }
}
