//! Structured logging setup using `tracing-subscriber`.
//!
//! The crate logs hook dispatch and sequencing through the `log` facade.
//! With the `structured-logging` feature, [`TracingLogger`] installs a
//! `tracing-subscriber` formatter that also captures those `log` records, so
//! they can be emitted as pretty, compact or JSON lines.
//!
//! ```toml
//! [dependencies]
//! tensorlogic-callbacks = { version = "0.1", features = ["structured-logging"] }
//! ```
//!
//! ```no_run
//! use tensorlogic_callbacks::structured_logging::{LogFormat, LogLevel, TracingLogger};
//!
//! TracingLogger::builder()
//!     .with_format(LogFormat::Json)
//!     .with_level(LogLevel::Debug)
//!     .build()
//!     .expect("Failed to initialize logger");
//! ```

use crate::{CallbackError, CallbackResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    Pretty,
    /// Single-line output without colors.
    Compact,
    /// JSON lines.
    Json,
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Every dispatched hook (trace level).
    Trace,
    /// Run and epoch boundaries.
    Debug,
    /// Info and higher.
    Info,
    /// Contract warnings and errors only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for [`TracingLogger`].
#[derive(Debug, Clone)]
pub struct TracingLoggerBuilder {
    format: LogFormat,
    level: LogLevel,
    env_filter: Option<String>,
    with_targets: bool,
}

impl Default for TracingLoggerBuilder {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            level: LogLevel::Info,
            env_filter: None,
            with_targets: true,
        }
    }
}

impl TracingLoggerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the level for this crate's records.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set a custom filter directive (overrides the level and `RUST_LOG`).
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Include target names (module paths) in records.
    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    fn directive(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!("tensorlogic_callbacks={}", self.level.as_str()),
        }
    }

    /// Build and install the global subscriber.
    ///
    /// Only one global subscriber can exist; a second call returns an error.
    pub fn build(self) -> CallbackResult<TracingLogger> {
        let env_filter = match self.env_filter {
            Some(_) => EnvFilter::try_new(self.directive())
                .map_err(|e| CallbackError::ConfigError(format!("Invalid env filter: {}", e)))?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.directive())),
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        let layer = fmt::layer().with_target(self.with_targets);
        let installed = match self.format {
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.compact().with_ansi(false)).try_init(),
            LogFormat::Json => registry.with(layer.json()).try_init(),
        };
        installed.map_err(|e| {
            CallbackError::ConfigError(format!("Failed to initialize tracing: {}", e))
        })?;

        Ok(TracingLogger {
            format: self.format,
        })
    }
}

/// Handle to the installed subscriber.
#[derive(Debug)]
pub struct TracingLogger {
    format: LogFormat,
}

impl TracingLogger {
    /// Create a new logger builder.
    pub fn builder() -> TracingLoggerBuilder {
        TracingLoggerBuilder::new()
    }

    /// Install with default settings (compact format, info level).
    pub fn init() -> CallbackResult<Self> {
        Self::builder().build()
    }

    /// Format the subscriber was installed with.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}
