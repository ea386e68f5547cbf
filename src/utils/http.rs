//! HTTP helpers shared by provider adapters

use crate::error::LlmError;

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Pull a human-readable message out of a provider error body.
///
/// Understands `{"error": {"message": ...}}` (Gemini, OpenAI) and
/// `{"error": "..."}` (Ollama); falls back to the raw body.
fn extract_error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    error.as_str().map(ToString::to_string)
}

/// Map a non-success HTTP response to an `LlmError`.
pub fn classify_http_error(provider_id: &str, status: u16, body_text: &str) -> LlmError {
    let parsed = serde_json::from_str::<serde_json::Value>(body_text).ok();
    let message = parsed
        .as_ref()
        .and_then(extract_error_message)
        .unwrap_or_else(|| body_text.chars().take(200).collect());

    match status {
        401 => LlmError::AuthenticationError(format!("provider={provider_id} {message}")),
        429 => LlmError::RateLimitError(format!("provider={provider_id} {message}")),
        _ => match parsed {
            Some(details) => LlmError::api_error_with_details(status, message, details),
            None => LlmError::api_error(status, message),
        },
    }
}

/// Build the reqwest client an adapter uses for every call.
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| LlmError::ConfigurationError(format!("Failed to create HTTP client: {e}")))
}

/// Pass successful responses through; turn everything else into an error.
pub async fn ensure_success(
    provider_id: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(provider = provider_id, status = status.as_u16(), "provider returned an error");
    Err(classify_http_error(provider_id, status.as_u16(), &body))
}
