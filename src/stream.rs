//! Streaming primitives
//!
//! Every backend adapter produces a [`TextStream`], whatever streaming
//! primitive its provider uses natively (SSE for Gemini and OpenAI,
//! newline-delimited JSON for Ollama). The helpers here turn an HTTP body
//! into a stream of JSON payloads for either framing.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;

use crate::error::LlmError;

/// Lazy, finite, non-restartable sequence of text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Stream of JSON payloads decoded from a provider response body.
pub type JsonStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, LlmError>> + Send>>;

/// SSE `data` payloads marking the end of a stream.
const DONE_MARKER: &str = "[DONE]";

/// Parse SSE `data:` payloads of a response body as JSON objects.
///
/// Empty payloads and the `[DONE]` marker are skipped. Transport and parse
/// failures end the stream with an error instead of truncating silently.
pub fn sse_json_values(label: &'static str, response: reqwest::Response) -> JsonStream {
    let mut events = Box::pin(response.bytes_stream().eventsource());
    let out = async_stream::stream! {
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("SSE stream error ({label}): {e}")));
                    return;
                }
            };
            let data = event.data.trim();
            if data.is_empty() || data == DONE_MARKER {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) => yield Ok(value),
                Err(e) => {
                    yield Err(LlmError::ParseError(format!(
                        "Failed to parse SSE JSON ({label}): {e}"
                    )));
                    return;
                }
            }
        }
    };
    Box::pin(out)
}

/// Parse a newline-delimited JSON response body.
///
/// Lines may be split across network chunks; a partial trailing line is
/// buffered until its newline (or the end of the body) arrives.
pub fn ndjson_values<S, B, E>(label: &'static str, bytes: S) -> JsonStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let out = async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let chunk = bytes.next().await;
            let finished = chunk.is_none();
            match chunk {
                Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    yield Err(LlmError::StreamError(format!("NDJSON stream error ({label}): {e}")));
                    return;
                }
                None => buffer.push(b'\n'),
            }
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(line) {
                    Ok(value) => yield Ok(value),
                    Err(e) => {
                        yield Err(LlmError::ParseError(format!(
                            "Failed to parse NDJSON line ({label}): {e}"
                        )));
                        return;
                    }
                }
            }
            if finished {
                return;
            }
        }
    };
    Box::pin(out)
}
