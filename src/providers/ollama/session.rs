use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::config::OllamaConfig;
use super::convert::{ChatSettings, build_chat_request};
use super::types::{OllamaChatRequest, OllamaChatResponse};
use crate::error::LlmError;
use crate::schema::to_ollama_format;
use crate::stream::{TextStream, ndjson_values};
use crate::traits::ProviderSession;
use crate::types::{ChatTurn, GenerateRequest, Generation};
use crate::utils::http::{ensure_success, join_url};
use crate::utils::tokens::heuristic_token_count;

/// Session against a local Ollama model
#[derive(Debug)]
pub struct OllamaSession {
    config: Arc<OllamaConfig>,
    http_client: reqwest::Client,
    settings: ChatSettings,
}

impl OllamaSession {
    pub(crate) fn new(
        config: Arc<OllamaConfig>,
        http_client: reqwest::Client,
        settings: ChatSettings,
    ) -> Self {
        Self {
            config,
            http_client,
            settings,
        }
    }

    async fn send(&self, body: &OllamaChatRequest) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http_client
            .post(join_url(&self.config.base_url, "api/chat"))
            .json(body)
            .send()
            .await?;
        ensure_success("ollama", response).await
    }

    fn request(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<OllamaChatRequest, LlmError> {
        let format = request.response_constraint.as_ref().map(to_ollama_format);
        build_chat_request(&request.turns, &self.settings, format, stream)
    }
}

#[async_trait]
impl ProviderSession for OllamaSession {
    async fn generate_content(&self, request: GenerateRequest) -> Result<Generation, LlmError> {
        let body = self.request(&request, false)?;
        debug!(model = %self.settings.model, turns = request.turns.len(), "ollama chat");
        let response: OllamaChatResponse = self.send(&body).await?.json().await?;
        if let Some(error) = response.error {
            return Err(LlmError::provider_error("ollama", error));
        }
        Ok(Generation {
            text: response.message.map(|m| m.content).unwrap_or_default(),
            usage_tokens: response.prompt_eval_count,
        })
    }

    async fn generate_content_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, LlmError> {
        let body = self.request(&request, true)?;
        debug!(model = %self.settings.model, turns = request.turns.len(), "ollama streaming chat");
        let response = self.send(&body).await?;

        let mut lines = ndjson_values("ollama", response.bytes_stream());
        let out = async_stream::stream! {
            while let Some(line) = lines.next().await {
                let value = match line {
                    Ok(value) => value,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let chunk: OllamaChatResponse = match serde_json::from_value(value) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::ParseError(format!("ollama stream chunk: {e}")));
                        return;
                    }
                };
                if let Some(error) = chunk.error {
                    yield Err(LlmError::StreamError(format!("ollama: {error}")));
                    return;
                }
                if let Some(message) = chunk.message
                    && !message.content.is_empty()
                {
                    yield Ok(message.content);
                }
                if chunk.done {
                    return;
                }
            }
        };
        Ok(Box::pin(out))
    }

    /// Ollama has no counting endpoint; a one-token generation reports
    /// `prompt_eval_count`. The count is approximate: a warm model reuses
    /// cached prompt prefixes and only reports the uncached tail, so the
    /// character heuristic acts as a floor.
    async fn count_tokens(&self, turns: &[ChatTurn]) -> Result<u64, LlmError> {
        let mut body = build_chat_request(turns, &self.settings, None, false)?;
        body.options.num_predict = Some(1);
        let response: OllamaChatResponse = self.send(&body).await?.json().await?;
        let heuristic = heuristic_token_count(turns);
        Ok(response
            .prompt_eval_count
            .map_or(heuristic, |reported| reported.max(heuristic)))
    }
}
