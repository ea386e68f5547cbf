//! Local runtime backend (Ollama)
//!
//! `/api/chat` with newline-delimited JSON streaming. Availability is
//! probed against `/api/tags`.

mod adapter;
mod config;
pub mod convert;
mod session;
pub mod types;

pub use adapter::OllamaAdapter;
pub use config::{DEFAULT_HOST, DEFAULT_MODEL, OllamaConfig};
pub use session::OllamaSession;
