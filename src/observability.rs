//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; applications that want them on
//! stdout call one of the `init_*` functions once at startup.

use tracing_subscriber::EnvFilter;

use crate::error::LlmError;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(LlmError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
        }
    }
}

impl SubscriberConfig {
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Default::default()
        }
    }

    pub const fn with_log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }

    pub const fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Directive applied when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        format!(
            "prompt_polyfill={}",
            self.log_level.as_str().to_lowercase()
        )
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

fn parse_level(level: &str) -> Result<tracing::Level, LlmError> {
    level.parse().map_err(|_| {
        LlmError::ConfigurationError(format!(
            "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
        ))
    })
}

/// Install a global fmt subscriber.
///
/// Returns `false` when another subscriber was already installed.
pub fn init_subscriber(config: SubscriberConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(true);
    let result = match config.output_format {
        OutputFormat::Text => builder.try_init(),
        OutputFormat::Json => builder.json().try_init(),
        OutputFormat::JsonCompact => builder.json().flatten_event(true).try_init(),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "tracing subscriber already installed");
            false
        }
    }
}

/// Build a config from `PROMPT_POLYFILL_LOG_LEVEL` and
/// `PROMPT_POLYFILL_LOG_FORMAT`.
pub fn config_from_env() -> Result<SubscriberConfig, LlmError> {
    let mut config = SubscriberConfig::default();
    if let Ok(level) = std::env::var("PROMPT_POLYFILL_LOG_LEVEL") {
        config.log_level = parse_level(&level)?;
    }
    if let Ok(format) = std::env::var("PROMPT_POLYFILL_LOG_FORMAT") {
        config.output_format = format.parse()?;
    }
    Ok(config)
}

pub fn init_from_env() -> Result<bool, LlmError> {
    Ok(init_subscriber(config_from_env()?))
}
