//! Utility modules
//!
//! Cancellation, mime detection and HTTP helpers shared by the session and
//! the provider adapters.

pub mod cancel;
pub mod http;
pub mod mime;
pub mod tokens;
