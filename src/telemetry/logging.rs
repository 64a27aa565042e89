//! Logging initialization.
//!
//! JSON output for production, pretty printing for development, level
//! selection via an `EnvFilter` directive string.

use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive, e.g. "info" or "dispatch_core=debug".
    pub level: String,
    /// Log file path; stderr when `None`.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

/// Errors from logging initialization.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("failed to open log file: {0}")]
    FileOpen(String),
    #[error("subscriber already initialized")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber. Call once at application startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LogError::InvalidFilter(e.to_string()))?;
    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match (config.format, &config.output_path) {
        (LogFormat::Pretty, _) => registry.with(fmt::layer().pretty()).try_init(),
        (LogFormat::Json, None) => registry.with(fmt::layer().json()).try_init(),
        (LogFormat::Json, Some(path)) => {
            let file = std::fs::File::create(path)
                .map_err(|e| LogError::FileOpen(e.to_string()))?;
            registry
                .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
                .try_init()
        }
    };
    init_result.map_err(|_| LogError::AlreadyInitialized)
}
