//! Errors raised by the review API and Telegram clients

use compact_str::CompactString;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response from {path}: {message}")]
    JsonParse {
        path: CompactString,
        message: CompactString,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authentication failed: {message}")]
    Authentication { message: CompactString },

    #[error("{resource} not found")]
    NotFound { resource: CompactString },

    #[error("Rate limit exceeded{}", retry_after_suffix(.retry_after))]
    RateLimit { retry_after: Option<u64> },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: CompactString },

    #[error("Message was not delivered (code {code}): {description}")]
    Delivery { code: u16, description: CompactString },

    #[error("Invalid {field}: {message}")]
    ConfigValidation {
        field: &'static str,
        message: CompactString,
    },
}

/// Coarse classification used in log records and scheduling decisions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection could not be made or was interrupted
    Transport,
    Timeout,
    /// Server answered with a non-success status
    Http,
    /// Body was not the expected JSON shape
    Decode,
    /// Telegram refused the message
    Delivery,
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Http(e) if e.is_decode() => ErrorKind::Decode,
            Self::Http(e) if e.is_status() => ErrorKind::Http,
            Self::Http(_) => ErrorKind::Transport,
            Self::JsonParse { .. } => ErrorKind::Decode,
            Self::Authentication { .. }
            | Self::NotFound { .. }
            | Self::RateLimit { .. }
            | Self::Api { .. } => ErrorKind::Http,
            Self::Delivery { .. } => ErrorKind::Delivery,
            Self::ConfigValidation { .. } => ErrorKind::Config,
        }
    }

    pub fn json_parse(
        path: impl Into<CompactString>,
        message: impl Into<CompactString>,
        source: serde_json::Error,
    ) -> Self {
        Self::JsonParse { path: path.into(), message: message.into(), source }
    }

    pub fn authentication(message: impl Into<CompactString>) -> Self {
        Self::Authentication { message: message.into() }
    }

    pub fn not_found(resource: impl Into<CompactString>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn rate_limit(retry_after: Option<u64>) -> Self {
        Self::RateLimit { retry_after }
    }

    pub fn api(status: u16, message: impl Into<CompactString>) -> Self {
        Self::Api { status, message: message.into() }
    }

    pub fn delivery(code: u16, description: impl Into<CompactString>) -> Self {
        Self::Delivery { code, description: description.into() }
    }

    pub fn config_validation(field: &'static str, message: impl Into<CompactString>) -> Self {
        Self::ConfigValidation { field, message: message.into() }
    }
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Http => "http",
            Self::Decode => "decode",
            Self::Delivery => "delivery",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let parse = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();

        assert_eq!(ClientError::json_parse("/x", "bad", parse).kind(), ErrorKind::Decode);
        assert_eq!(ClientError::authentication("nope").kind(), ErrorKind::Http);
        assert_eq!(ClientError::delivery(400, "chat not found").kind(), ErrorKind::Delivery);
        assert_eq!(
            ClientError::config_validation("chat_id", "missing").kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn rate_limit_message_mentions_retry_after() {
        assert_eq!(
            ClientError::rate_limit(Some(12)).to_string(),
            "Rate limit exceeded, retry after 12s"
        );
        assert_eq!(ClientError::rate_limit(None).to_string(), "Rate limit exceeded");
    }
}
