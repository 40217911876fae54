use std::path::PathBuf;

use compact_str::CompactString;
use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, BotError>;

/// Errors that stop the notifier before its polling loop starts
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoadError { path: PathBuf, message: String },

    #[error("Invalid configuration: {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(CompactString),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl BotError {
    /// Create a configuration load error
    pub fn config_load_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigLoadError { path, message: source.to_string() }
    }

    /// Create a configuration validation error
    pub fn config_validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidationError { field: field.into(), message: message.into() }
    }

    pub fn logging_init(message: impl Into<CompactString>) -> Self {
        Self::LoggingInit(message.into())
    }
}
