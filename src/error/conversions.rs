//! Type Conversions for LlmError
//!
//! From implementations for the error types of the crates this library sits on.

use super::types::LlmError;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<hound::Error> for LlmError {
    fn from(err: hound::Error) -> Self {
        Self::InvalidInput(format!("WAV encoding failed: {err}"))
    }
}

impl From<png::EncodingError> for LlmError {
    fn from(err: png::EncodingError) -> Self {
        Self::InternalError(format!("PNG encoding failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::JsonError(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let llm_err: LlmError = io_err.into();
        assert!(matches!(llm_err, LlmError::IoError(msg) if msg.contains("gone")));
    }
}
