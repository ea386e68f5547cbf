use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::config::GeminiConfig;
use super::convert::{
    GenerationSettings, build_generate_request, candidate_text, response_text, to_gemini_contents,
};
use super::types::{CountTokensRequest, CountTokensResponse, GenerateContentResponse};
use crate::error::LlmError;
use crate::schema::to_gemini_schema;
use crate::stream::{TextStream, sse_json_values};
use crate::traits::ProviderSession;
use crate::types::{ChatTurn, GenerateRequest, Generation};
use crate::utils::http::{ensure_success, join_url};

/// Gemini model handle bound to one session's settings
#[derive(Debug)]
pub struct GeminiSession {
    config: Arc<GeminiConfig>,
    http_client: reqwest::Client,
    settings: GenerationSettings,
    /// Session-level constraint and its native form
    default_schema: Option<(Value, Value)>,
}

impl GeminiSession {
    pub(crate) fn new(
        config: Arc<GeminiConfig>,
        http_client: reqwest::Client,
        settings: GenerationSettings,
        default_schema: Option<(Value, Value)>,
    ) -> Self {
        Self {
            config,
            http_client,
            settings,
            default_schema,
        }
    }

    fn native_schema(&self, constraint: Option<&Value>) -> Result<Option<Value>, LlmError> {
        let Some(constraint) = constraint else {
            return Ok(None);
        };
        if let Some((source, native)) = &self.default_schema {
            if source == constraint {
                return Ok(Some(native.clone()));
            }
        }
        Ok(Some(to_gemini_schema(constraint).to_value()?))
    }

    fn model_url(&self, method: &str) -> String {
        join_url(
            &self.config.base_url,
            &format!("models/{}:{method}", self.config.model),
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        ensure_success("gemini", response).await
    }
}

#[async_trait]
impl ProviderSession for GeminiSession {
    async fn generate_content(&self, request: GenerateRequest) -> Result<Generation, LlmError> {
        let schema = self.native_schema(request.response_constraint.as_ref())?;
        let body = build_generate_request(&request.turns, &self.settings, schema);
        debug!(model = %self.config.model, turns = request.turns.len(), "gemini generateContent");
        let response: GenerateContentResponse = self
            .post(&self.model_url("generateContent"), &body)
            .await?
            .json()
            .await?;
        let text = response_text(&response)?;
        let usage = response
            .usage_metadata
            .as_ref()
            .and_then(|u| u.prompt_token_count);
        Ok(Generation {
            text,
            usage_tokens: usage,
        })
    }

    async fn generate_content_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, LlmError> {
        let schema = self.native_schema(request.response_constraint.as_ref())?;
        let body = build_generate_request(&request.turns, &self.settings, schema);
        let url = format!("{}?alt=sse", self.model_url("streamGenerateContent"));
        debug!(model = %self.config.model, turns = request.turns.len(), "gemini streamGenerateContent");
        let response = self.post(&url, &body).await?;

        let mut events = sse_json_values("gemini", response);
        let out = async_stream::stream! {
            while let Some(event) = events.next().await {
                let value = match event {
                    Ok(value) => value,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if let Some(error) = value.get("error") {
                    yield Err(LlmError::StreamError(format!("gemini: {error}")));
                    return;
                }
                let chunk: GenerateContentResponse = match serde_json::from_value(value) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::ParseError(format!("gemini stream chunk: {e}")));
                        return;
                    }
                };
                let text = candidate_text(&chunk);
                if !text.is_empty() {
                    yield Ok(text);
                }
            }
        };
        Ok(Box::pin(out))
    }

    async fn count_tokens(&self, turns: &[ChatTurn]) -> Result<u64, LlmError> {
        let body = CountTokensRequest {
            contents: to_gemini_contents(turns),
        };
        let response: CountTokensResponse = self
            .post(&self.model_url("countTokens"), &body)
            .await?
            .json()
            .await?;
        Ok(response.total_tokens)
    }
}
