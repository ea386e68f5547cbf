//! OpenAI-compatible backend
//!
//! Chat Completions over HTTP. There is no server-side session and no
//! token counting endpoint, so every call carries the whole conversation
//! and token counts are estimated.

mod adapter;
mod config;
pub mod convert;
mod session;
pub mod types;

pub use adapter::OpenAiAdapter;
pub use config::{DEFAULT_AUDIO_MODEL, DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig};
pub use session::OpenAiSession;
