use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

use super::config::OpenAiConfig;
use super::convert::{PreparedRequest, build_body, select_model};
use super::types::{ChatCompletionChunk, ChatCompletionResponse};
use crate::error::LlmError;
use crate::schema::{StrictSchema, to_strict_json_schema, unwrap_strict_response};
use crate::stream::{TextStream, sse_json_values};
use crate::traits::ProviderSession;
use crate::types::{ChatTurn, GenerateRequest, Generation, Modalities};
use crate::utils::http::{ensure_success, join_url};
use crate::utils::tokens::heuristic_token_count;

/// Stateless chat completions session; the full conversation is sent on
/// every call.
#[derive(Debug)]
pub struct OpenAiSession {
    config: Arc<OpenAiConfig>,
    http_client: reqwest::Client,
    temperature: f32,
    system_instruction: Option<String>,
    default_schema: Option<(Value, StrictSchema)>,
}

impl OpenAiSession {
    pub(crate) fn new(
        config: Arc<OpenAiConfig>,
        http_client: reqwest::Client,
        temperature: f32,
        system_instruction: Option<String>,
        default_schema: Option<(Value, StrictSchema)>,
    ) -> Self {
        Self {
            config,
            http_client,
            temperature,
            system_instruction,
            default_schema,
        }
    }

    fn strict_schema(&self, constraint: Option<&Value>) -> Option<StrictSchema> {
        let constraint = constraint?;
        match &self.default_schema {
            Some((source, strict)) if source == constraint => Some(strict.clone()),
            _ => Some(to_strict_json_schema(constraint)),
        }
    }

    fn prepare(&self, request: &GenerateRequest, stream: bool) -> Result<PreparedRequest, LlmError> {
        let model = select_model(
            &request.turns,
            &self.config.model,
            &self.config.audio_model,
            request.response_constraint.is_some(),
        )?;
        let strict = self.strict_schema(request.response_constraint.as_ref());
        let audio = Modalities::of(&request.turns).audio;
        let body = build_body(
            model,
            &request.turns,
            self.system_instruction.as_deref(),
            self.temperature,
            strict.as_ref(),
            audio,
            stream,
        )?;
        Ok(PreparedRequest {
            model: model.to_string(),
            body,
            wrapped: strict.is_some_and(|s| s.wrapped),
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http_client
            .post(join_url(&self.config.base_url, "chat/completions"))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        ensure_success("openai", response).await
    }
}

#[async_trait]
impl ProviderSession for OpenAiSession {
    async fn generate_content(&self, request: GenerateRequest) -> Result<Generation, LlmError> {
        let prepared = self.prepare(&request, false)?;
        debug!(model = %prepared.model, turns = request.turns.len(), wrapped = prepared.wrapped, "openai chat completion");
        let response: ChatCompletionResponse = self.send(&prepared.body).await?.json().await?;
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::provider_error("openai", "Response contained no choices"))?;
        let text = match (message.content, message.refusal) {
            (Some(content), _) => content,
            (None, Some(refusal)) => {
                return Err(LlmError::provider_error(
                    "openai",
                    format!("Model refused: {refusal}"),
                ));
            }
            (None, None) => String::new(),
        };
        Ok(Generation {
            text: unwrap_strict_response(&text, prepared.wrapped),
            usage_tokens: response.usage.and_then(|u| u.prompt_tokens),
        })
    }

    async fn generate_content_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, LlmError> {
        let prepared = self.prepare(&request, true)?;
        debug!(model = %prepared.model, turns = request.turns.len(), wrapped = prepared.wrapped, "openai streaming chat completion");
        let response = self.send(&prepared.body).await?;
        let wrapped = prepared.wrapped;

        let mut events = sse_json_values("openai", response);
        let out = async_stream::stream! {
            // Wrapped schemas are buffered so the caller only sees the unwrapped value.
            let mut buffered = String::new();
            while let Some(event) = events.next().await {
                let value = match event {
                    Ok(value) => value,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if let Some(error) = value.get("error") {
                    yield Err(LlmError::StreamError(format!("openai: {error}")));
                    return;
                }
                let chunk: ChatCompletionChunk = match serde_json::from_value(value) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::ParseError(format!("openai stream chunk: {e}")));
                        return;
                    }
                };
                let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) else {
                    continue;
                };
                if delta.is_empty() {
                    continue;
                }
                if wrapped {
                    buffered.push_str(&delta);
                } else {
                    yield Ok(delta);
                }
            }
            if wrapped && !buffered.is_empty() {
                yield Ok(unwrap_strict_response(&buffered, true));
            }
        };
        Ok(Box::pin(out))
    }

    async fn count_tokens(&self, turns: &[ChatTurn]) -> Result<u64, LlmError> {
        Ok(heuristic_token_count(turns))
    }
}
