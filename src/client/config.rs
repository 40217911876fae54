//! Configuration management for the review API and Telegram clients

use std::{path::PathBuf, time::Duration};

use compact_str::CompactString;

use super::error::{ClientError, Result};
use crate::{config::BotConfig, id::ChatId};

/// Main configuration for the notifier clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Homework review API
    pub review: ReviewConfig,
    /// Telegram Bot API
    pub telegram: TelegramConfig,
    /// Polling configuration
    pub polling: PollingConfig,
    /// Request configuration
    pub request: RequestConfig,
    /// Debug configuration
    pub debug: DebugConfig,
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Base URL of the user API, `homework_statuses/` is appended to it
    pub base_url: CompactString,
    /// OAuth token
    pub token: CompactString,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub base_url: CompactString,
    /// Bot token
    pub token: CompactString,
    /// The single chat every message goes to
    pub chat_id: ChatId,
}

/// Polling intervals configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Sleep after every completed poll
    pub interval: Duration,
    /// Sleep after a poll that failed unexpectedly
    pub error_backoff: Duration,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout
    pub timeout: Duration,
}

/// Debug and logging configuration
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    /// Enable debug logging of HTTP responses
    pub log_responses: bool,
    /// Directory for storing debug logs
    pub log_directory: Option<PathBuf>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            error_backoff: Duration::from_secs(30),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30) }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(review: ReviewConfig, telegram: TelegramConfig) -> Self {
        Self {
            review,
            telegram,
            polling: PollingConfig::default(),
            request: RequestConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("api_url", &self.review.base_url)?;
        validate_url("telegram_url", &self.telegram.base_url)?;

        if self.review.token.trim().is_empty() {
            return Err(ClientError::config_validation(
                "api_token",
                "Review API token cannot be empty",
            ));
        }

        if self.telegram.token.trim().is_empty() {
            return Err(ClientError::config_validation(
                "telegram_token",
                "Telegram bot token cannot be empty",
            ));
        }

        if self.telegram.token.contains('/') {
            return Err(ClientError::config_validation(
                "telegram_token",
                "Telegram bot token cannot contain '/'",
            ));
        }

        if self.telegram.chat_id.is_empty() {
            return Err(ClientError::config_validation(
                "chat_id",
                "Chat id cannot be empty",
            ));
        }

        if self.polling.interval.is_zero() {
            return Err(ClientError::config_validation(
                "poll_interval_secs",
                "Polling interval must be greater than zero",
            ));
        }

        if self.polling.error_backoff.is_zero() {
            return Err(ClientError::config_validation(
                "error_backoff_secs",
                "Error backoff must be greater than zero",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "request_timeout_secs",
                "Timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Set polling configuration
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Set debug configuration
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Enable debug logging
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug.log_responses = enabled;
        self
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::config_validation(field, "URL cannot be empty"));
    }

    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ClientError::config_validation(
            field,
            "URL must start with http:// or https://",
        ));
    }

    if url::Url::parse(value).is_err() {
        return Err(ClientError::config_validation(
            field,
            "URL is not a valid URL format",
        ));
    }

    Ok(())
}

impl TryFrom<&BotConfig> for ClientConfig {
    type Error = ClientError;

    fn try_from(config: &BotConfig) -> Result<Self> {
        let chat_id = config.chat_id.clone().ok_or_else(|| {
            ClientError::config_validation("chat_id", "Chat id must be set")
        })?;

        let client_config = Self::new(
            ReviewConfig {
                base_url: config.api_url.clone(),
                token: config.api_token.clone(),
            },
            TelegramConfig {
                base_url: config.telegram_url.clone(),
                token: config.telegram_token.clone(),
                chat_id,
            },
        )
        .with_polling(PollingConfig {
            interval: Duration::from_secs(config.poll_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        })
        .with_request(RequestConfig {
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
        .with_debug(DebugConfig {
            log_responses: config.log_responses,
            log_directory: config.log_dir.as_ref().map(|dir| dir.join("responses")),
        });

        client_config.validate()?;
        Ok(client_config)
    }
}
