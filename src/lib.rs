//! prompt-polyfill
//!
//! Prompt API style language model sessions over heterogeneous backends:
//! Gemini (cloud multimodal), any OpenAI-compatible chat completions API,
//! and a local Ollama runtime.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prompt_polyfill::prelude::*;
//!
//! let backend = Arc::new(GeminiAdapter::new(GeminiConfig::new(api_key))?);
//! let mut session = LanguageModel::create(
//!     backend,
//!     CreateOptions::new().with_initial_prompts(vec![PromptMessage::system("You are terse.")]),
//! )
//! .await?;
//! let answer = session.prompt("2+2?", PromptOptions::new()).await?;
//! ```
#![deny(unsafe_code)]

pub mod config;
pub mod content;
pub mod error;
pub mod observability;
pub mod providers;
pub mod registry;
pub mod schema;
pub mod session;
pub mod stream;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::LlmError;
pub use session::{LanguageModel, SessionEvent};

pub mod prelude {
    pub use crate::config::{BackendKind, PolyfillConfig};
    pub use crate::content::canvas::{DrawableSource, OffscreenCanvas, RgbaImage};
    pub use crate::error::{ErrorCategory, LlmError};
    #[cfg(feature = "google")]
    pub use crate::providers::gemini::{GeminiAdapter, GeminiConfig};
    #[cfg(feature = "ollama")]
    pub use crate::providers::ollama::{OllamaAdapter, OllamaConfig};
    #[cfg(feature = "openai")]
    pub use crate::providers::openai::{OpenAiAdapter, OpenAiConfig};
    pub use crate::registry::BackendRegistry;
    pub use crate::session::{LanguageModel, PromptStream, SessionEvent};
    pub use crate::stream::TextStream;
    pub use crate::traits::{BackendAdapter, ProviderSession};
    pub use crate::types::*;
    pub use crate::utils::cancel::{AbortController, AbortSignal};
}
