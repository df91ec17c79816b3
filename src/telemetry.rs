//! Tracing subscriber setup
//!
//! The library itself only emits `tracing` events; applications opt into
//! output by installing a subscriber through one of these helpers.
//!
//! ```rust,ignore
//! use toolchat::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::error::{ChatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// JSON with the compact field layout
    JsonCompact,
}

impl FromStr for OutputFormat {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            _ => Err(ChatError::ConfigurationError(format!(
                "Invalid log format: {s}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write events to stdout.
    pub enable_console: bool,
    /// Also append events to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Default::default()
        }
    }

    /// Warnings and errors as JSON, to a file only.
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            enable_console: false,
            log_file: Some(log_file),
        }
    }

    /// Directive string handed to the env filter.
    pub fn filter_directive(&self) -> String {
        format!(
            "toolchat={}",
            self.log_level.as_str().to_ascii_lowercase()
        )
    }
}

#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from its name (trace, debug, info, warn, error).
    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        let parsed = tracing::Level::from_str(level.trim()).map_err(|_| {
            ChatError::ConfigurationError(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(parsed);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when `log_file` is set; keep it alive for
/// as long as events should be flushed. When a global subscriber is already
/// installed this does nothing and returns `Ok(None)`.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("global tracing subscriber already installed");
        return Ok(None);
    }

    let filter = config.filter_directive();
    let format = config.output_format;

    match (&config.log_file, config.enable_console) {
        (None, false) => Ok(None),
        (None, true) => {
            install(format, &filter, std::io::stdout)?;
            Ok(None)
        }
        (Some(path), console) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            if console {
                install(format, &filter, writer.and(std::io::stdout))?;
            } else {
                install(format, &filter, writer)?;
            }
            Ok(Some(guard))
        }
    }
}

fn file_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let file_name = path.file_name().ok_or_else(|| {
        ChatError::ConfigurationError(format!("log file path has no file name: {}", path.display()))
    })?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(tracing_appender::rolling::never(directory, file_name))
}

fn install<W>(format: OutputFormat, filter: &str, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let result = match format {
        OutputFormat::Text => builder.try_init(),
        OutputFormat::Json => builder
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => builder
            .with_thread_ids(true)
            .json()
            .flatten_event(true)
            .try_init(),
    };

    result.map_err(|e| ChatError::ConfigurationError(format!("Failed to initialize tracing: {e}")))
}

pub fn init_default() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::default())
}

pub fn init_debug() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::debug())
}

pub fn init_production(log_file: PathBuf) -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::production(log_file))
}

/// Build the configuration from the environment.
///
/// - `TOOLCHAT_LOG_LEVEL`: trace, debug, info, warn, error
/// - `TOOLCHAT_LOG_FORMAT`: text, json, json-compact
/// - `TOOLCHAT_LOG_FILE`: log file path
pub fn config_from_env() -> Result<SubscriberConfig> {
    let mut builder = SubscriberConfig::builder();
    if let Ok(level) = std::env::var("TOOLCHAT_LOG_LEVEL") {
        builder = builder.log_level_str(&level)?;
    }
    if let Ok(format) = std::env::var("TOOLCHAT_LOG_FORMAT") {
        builder = builder.output_format(format.parse()?);
    }
    if let Ok(path) = std::env::var("TOOLCHAT_LOG_FILE") {
        builder = builder.log_file(path);
    }
    Ok(builder.build())
}

pub fn init_from_env() -> Result<Option<WorkerGuard>> {
    init_subscriber(config_from_env()?)
}
