//! Scripted in-process backend for session tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use prompt_polyfill::LlmError;
use prompt_polyfill::stream::TextStream;
use prompt_polyfill::traits::{BackendAdapter, ProviderSession};
use prompt_polyfill::types::{
    Availability, AvailabilityOptions, ChatTurn, GenerateRequest, Generation, ModelParams,
    SessionConfig,
};
use prompt_polyfill::utils::tokens::heuristic_token_count;

/// What the fake backend does for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Chunks(Vec<String>),
    /// Emit the chunks, then fail
    ChunksThenError(Vec<String>, LlmError),
    /// Emit the chunks, then never finish
    ChunksThenHang(Vec<String>),
    Error(LlmError),
    /// Never resolve
    Hang,
}

type Responder = Arc<dyn Fn(&GenerateRequest) -> Reply + Send + Sync>;

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<GenerateRequest>>,
    configs: Mutex<Vec<SessionConfig>>,
    counted: Mutex<Vec<Vec<ChatTurn>>>,
    generate_calls: AtomicUsize,
}

/// Fake backend whose replies come from a closure over the request
#[derive(Clone)]
pub struct ScriptedBackend {
    responder: Responder,
    recorded: Arc<Recorded>,
    availability: Availability,
    params: ModelParams,
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend").finish_non_exhaustive()
    }
}

impl ScriptedBackend {
    pub fn new(responder: impl Fn(&GenerateRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            recorded: Arc::new(Recorded::default()),
            availability: Availability::Available,
            params: ModelParams::default(),
        }
    }

    /// Always answers `text`.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Reply::Text(text.clone()))
    }

    /// Answers arithmetic questions and remembers names from history.
    pub fn conversational() -> Self {
        Self::new(|request| {
            let last = request.turns.last().map(ChatTurn::text).unwrap_or_default();
            if last.contains("2+2") {
                return Reply::Text("4".to_string());
            }
            if last.contains("What is my name") {
                let name = request
                    .turns
                    .iter()
                    .filter_map(|turn| turn.text().split("My name is ").nth(1).map(str::to_string))
                    .next()
                    .map(|rest| rest.trim_end_matches('.').to_string());
                return Reply::Text(match name {
                    Some(name) => format!("Your name is {name}."),
                    None => "I don't know.".to_string(),
                });
            }
            Reply::Text("OK.".to_string())
        })
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.recorded.requests.lock().unwrap().clone()
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.recorded.configs.lock().unwrap().clone()
    }

    pub fn counted(&self) -> Vec<Vec<ChatTurn>> {
        self.recorded.counted.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.recorded.generate_calls.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.recorded.configs.lock().unwrap().len()
    }
}

#[async_trait]
impl BackendAdapter for ScriptedBackend {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn params(&self) -> ModelParams {
        self.params
    }

    async fn availability(&self, _options: &AvailabilityOptions) -> Availability {
        self.availability
    }

    async fn create_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ProviderSession>, LlmError> {
        self.recorded.configs.lock().unwrap().push(config.clone());
        Ok(Arc::new(ScriptedSession {
            backend: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct ScriptedSession {
    backend: ScriptedBackend,
}

impl ScriptedSession {
    fn reply(&self, request: &GenerateRequest) -> Reply {
        self.backend
            .recorded
            .generate_calls
            .fetch_add(1, Ordering::SeqCst);
        self.backend
            .recorded
            .requests
            .lock()
            .unwrap()
            .push(request.clone());
        (self.backend.responder)(request)
    }
}

#[async_trait]
impl ProviderSession for ScriptedSession {
    async fn generate_content(&self, request: GenerateRequest) -> Result<Generation, LlmError> {
        match self.reply(&request) {
            Reply::Text(text) => Ok(Generation::new(text)),
            Reply::Chunks(chunks)
            | Reply::ChunksThenError(chunks, _)
            | Reply::ChunksThenHang(chunks) => Ok(Generation::new(chunks.concat())),
            Reply::Error(e) => Err(e),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn generate_content_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, LlmError> {
        let ok = |chunks: Vec<String>| futures::stream::iter(chunks.into_iter().map(Ok));
        let stream: TextStream = match self.reply(&request) {
            Reply::Text(text) => Box::pin(ok(vec![text])),
            Reply::Chunks(chunks) => Box::pin(ok(chunks)),
            Reply::ChunksThenError(chunks, e) => {
                Box::pin(ok(chunks).chain(futures::stream::once(async move { Err(e) })))
            }
            Reply::ChunksThenHang(chunks) => Box::pin(ok(chunks).chain(futures::stream::pending())),
            Reply::Error(e) => return Err(e),
            Reply::Hang => return std::future::pending().await,
        };
        Ok(stream)
    }

    async fn count_tokens(&self, turns: &[ChatTurn]) -> Result<u64, LlmError> {
        self.backend
            .recorded
            .counted
            .lock()
            .unwrap()
            .push(turns.to_vec());
        Ok(heuristic_token_count(turns))
    }
}
