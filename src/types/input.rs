//! Caller-facing input shapes
//!
//! Media values are an explicit tagged variant; the content converter
//! dispatches on the tag instead of probing value shapes at runtime.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::Role;
use crate::content::canvas::DrawableSource;

/// Binary blob with a declared mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Decoded audio: one float sample vector per channel plus the sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSampleBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioSampleBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel (the shortest channel wins).
    pub fn length(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }
}

/// A non-text value supplied by the caller
#[derive(Clone)]
pub enum MediaValue {
    /// In-memory blob carrying its own mime type
    Blob(Blob),
    /// Raw encoded bytes; the mime type is sniffed
    Bytes(Vec<u8>),
    /// A file on disk, read asynchronously
    File(PathBuf),
    /// Something that can paint itself onto a canvas (bitmaps, frames)
    Drawable(Arc<dyn DrawableSource>),
    /// Decoded audio samples
    AudioSamples(AudioSampleBuffer),
}

impl MediaValue {
    /// Short shape name used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bytes(_) => "byte buffer",
            Self::File(_) => "file",
            Self::Drawable(_) => "drawable source",
            Self::AudioSamples(_) => "audio sample buffer",
        }
    }
}

impl fmt::Debug for MediaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(blob) => f
                .debug_struct("Blob")
                .field("mime_type", &blob.mime_type)
                .field("len", &blob.bytes.len())
                .finish(),
            Self::Bytes(bytes) => f.debug_struct("Bytes").field("len", &bytes.len()).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Drawable(source) => f.debug_tuple("Drawable").field(source).finish(),
            Self::AudioSamples(buffer) => f
                .debug_struct("AudioSamples")
                .field("sample_rate", &buffer.sample_rate)
                .field("channels", &buffer.number_of_channels())
                .field("length", &buffer.length())
                .finish(),
        }
    }
}

impl From<Blob> for MediaValue {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<Vec<u8>> for MediaValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<PathBuf> for MediaValue {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<AudioSampleBuffer> for MediaValue {
    fn from(buffer: AudioSampleBuffer) -> Self {
        Self::AudioSamples(buffer)
    }
}

/// Declared media type of an input part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

/// One `{type, value}` entry of structured message content
#[derive(Debug, Clone)]
pub enum InputPart {
    Text(String),
    Image(MediaValue),
    Audio(MediaValue),
}

impl InputPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(value: impl Into<MediaValue>) -> Self {
        Self::Image(value.into())
    }

    pub fn audio(value: impl Into<MediaValue>) -> Self {
        Self::Audio(value.into())
    }
}

/// Content of a role-tagged message
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<InputPart>),
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<InputPart>> for MessageContent {
    fn from(parts: Vec<InputPart>) -> Self {
        Self::Parts(parts)
    }
}

/// A `{role, content}` message
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Anything accepted by `prompt`, `prompt_streaming`, `append` and
/// `measure_input_usage`.
#[derive(Debug, Clone)]
pub enum PromptInput {
    Text(String),
    Messages(Vec<PromptMessage>),
}

impl From<&str> for PromptInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PromptInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<PromptMessage>> for PromptInput {
    fn from(messages: Vec<PromptMessage>) -> Self {
        Self::Messages(messages)
    }
}

impl From<PromptMessage> for PromptInput {
    fn from(message: PromptMessage) -> Self {
        Self::Messages(vec![message])
    }
}

impl From<Vec<InputPart>> for PromptInput {
    fn from(parts: Vec<InputPart>) -> Self {
        Self::Messages(vec![PromptMessage::user(parts)])
    }
}
