//! Cancellation utilities
//!
//! `AbortController`/`AbortSignal` pair built on `tokio_util`'s
//! `CancellationToken`. Every long-running operation accepts an optional
//! signal; it is checked before the operation starts and raced against the
//! operation while it is in flight.

use std::future::Future;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::stream::TextStream;

/// Owner side: fires the signal.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal observed by operations.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Request cancellation. Pending and future operations observing the
    /// signal fail with `LlmError::Aborted`; dropped streams close their
    /// HTTP connections so providers stop generating.
    pub fn abort(&self) {
        self.token.cancel();
    }
}

/// Observer side, cheap to clone.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// A signal that has already fired.
    pub fn aborted() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { token }
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail fast when the signal already fired.
    pub fn check(&self) -> Result<(), LlmError> {
        if self.is_aborted() {
            Err(LlmError::aborted())
        } else {
            Ok(())
        }
    }

    /// Resolves once the signal fires.
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }
}

/// Check an optional signal.
pub fn check_signal(signal: Option<&AbortSignal>) -> Result<(), LlmError> {
    signal.map_or(Ok(()), AbortSignal::check)
}

/// Run `fut` unless the signal fires first.
///
/// An already-aborted signal fails without polling `fut` at all.
pub async fn abortable<T, F>(signal: Option<&AbortSignal>, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    let Some(signal) = signal else {
        return fut.await;
    };
    signal.check()?;
    tokio::select! {
        biased;
        _ = signal.fired() => Err(LlmError::aborted()),
        result = fut => result,
    }
}

/// Make a text stream abortable.
///
/// Once the signal fires, the next read yields `LlmError::Aborted` and the
/// stream ends; the inner stream is dropped right away, releasing the
/// provider connection it holds.
pub fn abortable_stream(stream: TextStream, signal: Option<AbortSignal>) -> TextStream {
    let Some(signal) = signal else {
        return stream;
    };
    let mut inner = stream;
    let s = async_stream::stream! {
        loop {
            let next = tokio::select! {
                biased;
                _ = signal.fired() => None,
                item = inner.next() => Some(item),
            };
            match next {
                None => {
                    drop(inner);
                    yield Err(LlmError::aborted());
                    return;
                }
                Some(None) => return,
                Some(Some(item)) => yield item,
            }
        }
    };
    Box::pin(s)
}
