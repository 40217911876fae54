//! Telegram Bot API client used to deliver notifications

use async_trait::async_trait;
use compact_str::{CompactString, format_compact};
use reqwest::Client;
use tracing::{debug, instrument};

use super::{
    config::{RequestConfig, TelegramConfig},
    error::{ClientError, Result},
};
use crate::{
    dispatcher::Dispatcher,
    domain::{SendMessageDto, TelegramResponseDto},
};

/// Longest text `sendMessage` accepts, in characters
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug)]
pub struct TelegramApi {
    client: Client,
    config: TelegramConfig,
}

impl TelegramApi {
    pub fn new(config: TelegramConfig, request: &RequestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(request.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> CompactString {
        format_compact!(
            "{}/bot{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    /// Send a text message to the configured chat, returning its message id
    #[instrument(skip(self, text), fields(chat_id = %self.config.chat_id, len = text.len()))]
    pub async fn send_message(&self, text: &str) -> Result<i64> {
        let text = clip_message(text);
        let body = SendMessageDto { chat_id: &self.config.chat_id, text };
        let response = self
            .client
            .post(self.method_url("sendMessage").as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        let reply: TelegramResponseDto = match serde_json::from_str(&raw) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(ClientError::api(status.as_u16(), raw.trim()));
            },
            Err(e) => {
                return Err(ClientError::json_parse("sendMessage", "Failed to parse response", e));
            },
        };

        match reply {
            TelegramResponseDto { ok: true, result: Some(message), .. } => {
                debug!(message_id = message.message_id, "Telegram accepted message");
                Ok(message.message_id)
            },
            TelegramResponseDto { ok: true, result: None, .. } => Ok(0),
            TelegramResponseDto { description, error_code, .. } => {
                let code = error_code.unwrap_or(status.as_u16());
                let description = description.unwrap_or_else(|| "no description".into());
                match code {
                    401 => Err(ClientError::authentication(description)),
                    429 => Err(ClientError::rate_limit(None)),
                    _ => Err(ClientError::delivery(code, description)),
                }
            },
        }
    }
}

/// Cut `text` down to what Telegram accepts
fn clip_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((end, _)) => {
            debug!(chars = text.chars().count(), "Truncating message to Telegram's limit");
            &text[..end]
        },
        None => text,
    }
}

#[async_trait]
impl Dispatcher for TelegramApi {
    async fn dispatch(&self, text: &str) -> Result<()> {
        self.send_message(text).await.map(|_| ())
    }
}
