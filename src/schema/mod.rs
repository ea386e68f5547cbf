//! Structured-output schema adapters
//!
//! Each backend wants the caller's JSON Schema in a different dialect.

mod gemini;
mod strict;

pub use gemini::{GeminiSchema, GeminiType, to_gemini_schema};
pub use strict::{StrictSchema, WRAPPED_PROPERTY, to_strict_json_schema, unwrap_strict_response};

use serde_json::Value;

use crate::error::LlmError;

/// Ollama's `format` field takes plain JSON Schema.
pub fn to_ollama_format(schema: &Value) -> Value {
    schema.clone()
}

/// Compile a response constraint for local validation.
pub fn compile_validator(schema: &Value) -> Result<jsonschema::Validator, LlmError> {
    jsonschema::validator_for(schema)
        .map_err(|e| LlmError::InvalidParameter(format!("Invalid response constraint: {e}")))
}

/// Check generated text against a compiled constraint.
pub fn validate_response(validator: &jsonschema::Validator, text: &str) -> Result<(), LlmError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        LlmError::ParseError(format!("Response is not valid JSON for the constraint: {e}"))
    })?;
    if validator.is_valid(&value) {
        return Ok(());
    }
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .take(3)
        .map(|e| e.to_string())
        .collect();
    Err(LlmError::ParseError(format!(
        "Response does not match the constraint: {}",
        errors.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_constraints_fail_to_compile() {
        let err = compile_validator(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidParameter(_)));
    }

    #[test]
    fn responses_are_validated() {
        let validator = compile_validator(&json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}},
            "required": ["n"]
        }))
        .unwrap();
        assert!(validate_response(&validator, r#"{"n": 4}"#).is_ok());
        assert!(matches!(
            validate_response(&validator, r#"{"n": "four"}"#),
            Err(LlmError::ParseError(_))
        ));
        assert!(matches!(
            validate_response(&validator, "four"),
            Err(LlmError::ParseError(_))
        ));
    }
}
