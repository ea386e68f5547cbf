//! Stateful conversation sessions (`LanguageModel`)
//!
//! A session owns its history and usage counters and talks to exactly one
//! backend through the [`BackendAdapter`] / [`ProviderSession`] traits.
//! Mutating operations take `&mut self`, so calls on one session are
//! serialized by the borrow checker.

mod events;

pub use events::{EVENT_CHANNEL_CAPACITY, SessionEvent};

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::content::{convert_initial_prompts, convert_prompt_input};
use crate::error::LlmError;
use crate::schema::{compile_validator, validate_response};
use crate::traits::{BackendAdapter, ProviderSession};
use crate::types::{
    Availability, AvailabilityOptions, ChatTurn, CloneOptions, CreateOptions, GenerateRequest,
    ModelParams, PromptInput, PromptOptions, SessionConfig,
};
use crate::utils::cancel::{abortable, abortable_stream, check_signal};
use crate::utils::tokens::{estimate_text_usage, estimate_usage};

/// Input quota used when `CreateOptions::input_quota` is not set.
pub const DEFAULT_INPUT_QUOTA: u64 = 1_000_000;

/// Text chunks of one `prompt_streaming` call.
///
/// The stream borrows its session until dropped.
pub type PromptStream<'a> = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'a>>;

fn validate_sampling(
    params: &ModelParams,
    temperature: Option<f32>,
    top_k: Option<u32>,
) -> Result<(f32, u32), LlmError> {
    let temperature = temperature.unwrap_or(params.default_temperature);
    if !(0.0..=params.max_temperature).contains(&temperature) {
        return Err(LlmError::InvalidParameter(format!(
            "temperature must be between 0 and {}, got {temperature}",
            params.max_temperature
        )));
    }
    let top_k = top_k.unwrap_or(params.default_top_k);
    if top_k == 0 || top_k > params.max_top_k {
        return Err(LlmError::InvalidParameter(format!(
            "topK must be between 1 and {}, got {top_k}",
            params.max_top_k
        )));
    }
    Ok((temperature, top_k))
}

/// A conversation bound to one backend
pub struct LanguageModel {
    id: Uuid,
    backend: Arc<dyn BackendAdapter>,
    provider: Arc<dyn ProviderSession>,
    config: SessionConfig,
    history: Vec<ChatTurn>,
    input_usage: u64,
    input_quota: u64,
    destroyed: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("id", &self.id)
            .field("backend", &self.backend.provider_id())
            .field("history_len", &self.history.len())
            .field("input_usage", &self.input_usage)
            .field("input_quota", &self.input_quota)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl LanguageModel {
    /// Probe whether `backend` can serve the requested modalities.
    pub async fn availability(
        backend: &dyn BackendAdapter,
        options: &AvailabilityOptions,
    ) -> Availability {
        backend.availability(options).await
    }

    /// Sampling defaults and ceilings of `backend`.
    pub fn params(backend: &dyn BackendAdapter) -> ModelParams {
        backend.params()
    }

    /// Create a session.
    ///
    /// System initial prompts are merged into one system instruction and
    /// never enter history; the other initial prompts seed it.
    pub async fn create(
        backend: Arc<dyn BackendAdapter>,
        options: CreateOptions,
    ) -> Result<Self, LlmError> {
        let signal = options.signal.as_ref();
        check_signal(signal)?;

        let (temperature, top_k) =
            validate_sampling(&backend.params(), options.temperature, options.top_k)?;
        if let Some(schema) = &options.response_constraint {
            compile_validator(schema)?;
        }

        let initial = abortable(signal, convert_initial_prompts(&options.initial_prompts)).await?;
        let config = SessionConfig {
            temperature,
            top_k,
            system_instruction: initial.system_instruction,
            response_constraint: options.response_constraint.clone(),
            expected_inputs: options.expected_inputs.clone(),
            expected_outputs: options.expected_outputs.clone(),
        };
        let provider = abortable(signal, backend.create_session(&config)).await?;

        let input_usage = config
            .system_instruction
            .as_deref()
            .map_or(0, estimate_text_usage)
            + estimate_usage(&initial.turns);
        let input_quota = options.input_quota.unwrap_or(DEFAULT_INPUT_QUOTA);
        let id = Uuid::new_v4();
        debug!(
            session = %id,
            backend = backend.provider_id(),
            temperature,
            top_k,
            initial_turns = initial.turns.len(),
            "created session"
        );
        if input_usage > input_quota {
            warn!(session = %id, input_usage, input_quota, "initial prompts exceed the input quota");
        }

        Ok(Self {
            id,
            backend,
            provider,
            config,
            history: initial.turns,
            input_usage,
            input_quota,
            destroyed: false,
            events: events::channel(),
        })
    }

    fn ensure_active(&self) -> Result<(), LlmError> {
        if self.destroyed {
            Err(LlmError::destroyed())
        } else {
            Ok(())
        }
    }

    /// Add to the usage estimate, notifying once when the quota is crossed.
    fn account_usage(&mut self, turns: &[ChatTurn]) {
        let before = self.input_usage;
        self.input_usage = before.saturating_add(estimate_usage(turns));
        if before <= self.input_quota && self.input_usage > self.input_quota {
            warn!(
                session = %self.id,
                input_usage = self.input_usage,
                input_quota = self.input_quota,
                "input quota exceeded"
            );
            // no subscribers is fine
            let _ = self.events.send(SessionEvent::QuotaOverflow {
                input_usage: self.input_usage,
                input_quota: self.input_quota,
            });
        }
    }

    fn request_for(&self, new_turns: &[ChatTurn], constraint: Option<serde_json::Value>) -> GenerateRequest {
        let mut turns = Vec::with_capacity(self.history.len() + new_turns.len());
        turns.extend_from_slice(&self.history);
        turns.extend_from_slice(new_turns);
        GenerateRequest::new(turns).with_response_constraint(constraint)
    }

    fn constraint_for(&self, options: &PromptOptions) -> Option<serde_json::Value> {
        options
            .response_constraint
            .clone()
            .or_else(|| self.config.response_constraint.clone())
    }

    /// Generate a response and append the exchange to history.
    ///
    /// History is only touched when generation (and validation against an
    /// active response constraint) succeeds.
    pub async fn prompt(
        &mut self,
        input: impl Into<PromptInput>,
        options: PromptOptions,
    ) -> Result<String, LlmError> {
        self.ensure_active()?;
        let signal = options.signal.as_ref();
        check_signal(signal)?;

        let input = input.into();
        let new_turns = abortable(signal, convert_prompt_input(&input)).await?;
        let constraint = self.constraint_for(&options);
        let validator = constraint.as_ref().map(compile_validator).transpose()?;

        self.account_usage(&new_turns);
        let request = self.request_for(&new_turns, constraint);
        debug!(session = %self.id, turns = request.turns.len(), "prompt");

        let provider = self.provider.clone();
        let generation = abortable(signal, provider.generate_content(request)).await?;
        if let Some(validator) = &validator {
            validate_response(validator, &generation.text)?;
        }
        if let Some(tokens) = generation.usage_tokens {
            debug!(session = %self.id, prompt_tokens = tokens, "provider reported usage");
        }

        self.history.extend(new_turns);
        self.history.push(ChatTurn::model_text(generation.text.clone()));
        Ok(generation.text)
    }

    /// Stream a response chunk by chunk.
    ///
    /// Input conversion and usage accounting happen before this returns.
    /// The exchange is committed to history only when the stream completes;
    /// an error or abort mid-stream commits nothing, but the usage already
    /// accounted is kept.
    pub async fn prompt_streaming(
        &mut self,
        input: impl Into<PromptInput>,
        options: PromptOptions,
    ) -> Result<PromptStream<'_>, LlmError> {
        self.ensure_active()?;
        let signal = options.signal.clone();
        check_signal(signal.as_ref())?;

        let input = input.into();
        let new_turns = abortable(signal.as_ref(), convert_prompt_input(&input)).await?;
        let constraint = self.constraint_for(&options);
        let validator = constraint.as_ref().map(compile_validator).transpose()?;

        self.account_usage(&new_turns);
        let request = self.request_for(&new_turns, constraint);
        debug!(session = %self.id, turns = request.turns.len(), "prompt_streaming");

        let this = self;
        let stream = async_stream::stream! {
            let provider = this.provider.clone();
            let opened = abortable(signal.as_ref(), provider.generate_content_stream(request)).await;
            let mut chunks = match opened {
                Ok(inner) => abortable_stream(inner, signal.clone()),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut full = String::new();
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        full.push_str(&chunk);
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        debug!(session = %this.id, error = %e, "stream ended with an error");
                        yield Err(e);
                        return;
                    }
                }
            }
            drop(chunks);

            if let Some(validator) = &validator {
                if let Err(e) = validate_response(validator, &full) {
                    yield Err(e);
                    return;
                }
            }
            this.history.extend(new_turns);
            this.history.push(ChatTurn::model_text(full));
        };
        Ok(Box::pin(stream))
    }

    /// Append user input to history without generating.
    pub async fn append(
        &mut self,
        input: impl Into<PromptInput>,
        options: PromptOptions,
    ) -> Result<(), LlmError> {
        self.ensure_active()?;
        let signal = options.signal.as_ref();
        check_signal(signal)?;

        let input = input.into();
        let new_turns = abortable(signal, convert_prompt_input(&input)).await?;
        self.account_usage(&new_turns);
        debug!(session = %self.id, turns = new_turns.len(), "append");
        self.history.extend(new_turns);
        Ok(())
    }

    /// Token count of `input` alone. Neither history nor usage changes.
    pub async fn measure_input_usage(
        &self,
        input: impl Into<PromptInput>,
        options: PromptOptions,
    ) -> Result<u64, LlmError> {
        self.ensure_active()?;
        let signal = options.signal.as_ref();
        check_signal(signal)?;

        let input = input.into();
        let turns = abortable(signal, convert_prompt_input(&input)).await?;
        abortable(signal, self.provider.count_tokens(&turns)).await
    }

    /// Copy this session with an independent history.
    ///
    /// The backend adapter is shared. The provider session is shared too
    /// unless sampling parameters are overridden, in which case a new one
    /// is created with the merged configuration.
    pub async fn clone_session(&self, options: CloneOptions) -> Result<Self, LlmError> {
        self.ensure_active()?;
        let signal = options.signal.as_ref();
        check_signal(signal)?;

        let mut config = self.config.clone();
        let provider = if options.temperature.is_some() || options.top_k.is_some() {
            let (temperature, top_k) = validate_sampling(
                &self.backend.params(),
                options.temperature.or(Some(config.temperature)),
                options.top_k.or(Some(config.top_k)),
            )?;
            config.temperature = temperature;
            config.top_k = top_k;
            abortable(signal, self.backend.create_session(&config)).await?
        } else {
            self.provider.clone()
        };

        let id = Uuid::new_v4();
        debug!(session = %id, source = %self.id, history = self.history.len(), "cloned session");
        Ok(Self {
            id,
            backend: self.backend.clone(),
            provider,
            config,
            history: self.history.clone(),
            input_usage: self.input_usage,
            input_quota: self.input_quota,
            destroyed: false,
            events: events::channel(),
        })
    }

    /// Destroy the session. Every later call fails with `InvalidState`.
    pub fn destroy(&mut self) {
        if !self.destroyed {
            debug!(session = %self.id, "destroyed session");
        }
        self.destroyed = true;
        self.history = Vec::new();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn backend(&self) -> &Arc<dyn BackendAdapter> {
        &self.backend
    }

    pub fn input_usage(&self) -> u64 {
        self.input_usage
    }

    pub fn input_quota(&self) -> u64 {
        self.input_quota
    }

    pub fn temperature(&self) -> f32 {
        self.config.temperature
    }

    pub fn top_k(&self) -> u32 {
        self.config.top_k
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.config.system_instruction.as_deref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Receive quota-overflow notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
