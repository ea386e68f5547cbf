//! Gemini backend
//!
//! Talks to the Generative Language REST API: `generateContent`,
//! `streamGenerateContent?alt=sse` and `countTokens`.

mod adapter;
mod config;
pub mod convert;
mod session;
pub mod types;

pub use adapter::GeminiAdapter;
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
pub use session::GeminiSession;
