//! Backend adapters, one module per provider
//!
//! Each provider is gated by a cargo feature (`google`, `openai`,
//! `ollama`).

#[cfg(feature = "google")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
