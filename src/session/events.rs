use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one lags.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Notifications emitted by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Input usage went past the quota. Generation still proceeds.
    QuotaOverflow { input_usage: u64, input_quota: u64 },
}

pub(crate) fn channel() -> broadcast::Sender<SessionEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}
