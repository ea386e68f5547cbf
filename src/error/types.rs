//! Core error types

use thiserror::Error;

/// Coarse classification of an [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The session (or another object) is in a state that forbids the call.
    State,
    /// The caller aborted the operation.
    Cancelled,
    /// The requested feature or modality combination is not supported.
    Unsupported,
    /// Bad input or parameters supplied by the caller.
    Validation,
    /// Missing or invalid configuration (API keys, URLs).
    Configuration,
    Authentication,
    RateLimit,
    /// 4xx responses other than auth and rate limiting.
    Client,
    /// 5xx responses.
    Server,
    Network,
    /// Provider output that could not be parsed or validated.
    Parsing,
    Unknown,
}

/// Unified error type for every operation in this crate.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: String,
        message: String,
        error_code: Option<String>,
    },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Build an `ApiError` without details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Build an `ApiError` carrying the raw provider body.
    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Build a `ProviderError` for in-band provider failures (stream error events etc.).
    pub fn provider_error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.into(),
            error_code: None,
        }
    }

    /// Abort error with the conventional message.
    pub fn aborted() -> Self {
        Self::Aborted("The operation was aborted".to_string())
    }

    /// Invalid-state error for operations on a destroyed session.
    pub fn destroyed() -> Self {
        Self::InvalidState("The session has been destroyed".to_string())
    }

    /// True for cancellations so callers can skip error reporting for them.
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// HTTP status code, when the error came from an HTTP response.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::AuthenticationError(_) => Some(401),
            Self::RateLimitError(_) => Some(429),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidState(_) => ErrorCategory::State,
            Self::Aborted(_) => ErrorCategory::Cancelled,
            Self::UnsupportedOperation(_) => ErrorCategory::Unsupported,
            Self::InvalidInput(_) | Self::InvalidParameter(_) => ErrorCategory::Validation,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::AuthenticationError(_) => ErrorCategory::Authentication,
            Self::RateLimitError(_) => ErrorCategory::RateLimit,
            Self::ApiError { code, .. } => match code {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                400..=499 => ErrorCategory::Client,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Unknown,
            },
            Self::HttpError(_) | Self::TimeoutError(_) | Self::StreamError(_) => {
                ErrorCategory::Network
            }
            Self::ParseError(_) | Self::JsonError(_) => ErrorCategory::Parsing,
            Self::ProviderError { .. } => ErrorCategory::Server,
            Self::IoError(_) | Self::InternalError(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether repeating the same call could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Server | ErrorCategory::Network
        )
    }
}
