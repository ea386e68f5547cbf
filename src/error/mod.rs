//! Error Handling Module
//!
//! Core error type (`LlmError`) shared by the session, the content converter,
//! the schema adapter and every backend adapter, plus conversions from the
//! error types of the crates underneath them.
//!
//! # Example
//!
//! ```rust,ignore
//! use prompt_polyfill::error::{ErrorCategory, LlmError};
//!
//! let error = LlmError::api_error(404, "Not found");
//! assert_eq!(error.category(), ErrorCategory::Client);
//! assert!(!error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
