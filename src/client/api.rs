//! HTTP client for the homework review API

use async_trait::async_trait;
use chrono::Local;
use compact_str::{CompactString, format_compact};
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    config::{DebugConfig, RequestConfig, ReviewConfig},
    error::{ClientError, Result},
};
use crate::{
    domain::{HomeworkStatusesDto, ReviewApiErrorDto},
    id::Cursor,
};

/// Source of homework status changes
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    /// Homeworks whose status changed at or after `from`
    async fn homework_statuses(&self, from: Cursor) -> Result<HomeworkStatusesDto>;
}

/// Pure HTTP client for the review API
#[derive(Debug)]
pub struct ReviewApi {
    client: Client,
    config: ReviewConfig,
    debug: DebugConfig,
}

impl ReviewApi {
    pub fn new(config: ReviewConfig, request: &RequestConfig, debug: DebugConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(request.timeout)
            .user_agent(concat!("homework-notifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config, debug })
    }

    fn statuses_url(&self) -> CompactString {
        format_compact!("{}/homework_statuses/", self.config.base_url.trim_end_matches('/'))
    }

    /// Perform authenticated GET request and deserialize JSON response
    async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        Q: serde::Serialize + ?Sized,
    {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("OAuth {}", self.config.token))
            .query(query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_path = response.url().path().to_string();
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let body = response.text().await?;

        if self.debug.log_responses {
            self.log_response_to_file(&url_path, &body);
        }

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                debug!(path = %url_path, body = %body, "Unexpected response body");
                ClientError::json_parse(url_path, "Failed to parse response", e)
            })
        } else {
            Err(error_from_status(status, &body, retry_after))
        }
    }

    /// Log HTTP response to file for debugging
    fn log_response_to_file(&self, path: &str, body: &str) {
        let Some(log_dir) = &self.debug.log_directory else {
            return;
        };

        if !log_dir.exists()
            && let Err(e) = std::fs::create_dir_all(log_dir)
        {
            warn!("Failed to create response log directory: {}", e);
            return;
        }

        let filename = format!(
            "{}_{}.json",
            Local::now().format("%Y-%m-%d_%H-%M-%S"),
            path.trim_matches('/').replace('/', "_")
        );
        let log_path = log_dir.join(filename);

        if let Err(e) = std::fs::write(&log_path, body) {
            warn!("Failed to write response log to {:?}: {}", log_path, e);
        } else {
            debug!("Response logged to {:?}", log_path);
        }
    }
}

#[async_trait]
impl HomeworkSource for ReviewApi {
    #[instrument(skip(self), fields(from_date = %from))]
    async fn homework_statuses(&self, from: Cursor) -> Result<HomeworkStatusesDto> {
        let url = self.statuses_url();
        let statuses: HomeworkStatusesDto =
            self.get_json(&url, &[("from_date", from.value())]).await?;
        debug!(
            homework_count = statuses.homeworks.len(),
            current_date = ?statuses.current_date,
            "Fetched homework statuses"
        );
        Ok(statuses)
    }
}

/// Map a non-success response from the review API
fn error_from_status(status: StatusCode, body: &str, retry_after: Option<u64>) -> ClientError {
    let detail = serde_json::from_str::<ReviewApiErrorDto>(body)
        .ok()
        .and_then(|e| e.message.or(e.code))
        .unwrap_or_else(|| body.trim().into());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::authentication(detail),
        StatusCode::NOT_FOUND => ClientError::not_found("Homework statuses endpoint"),
        StatusCode::TOO_MANY_REQUESTS => ClientError::rate_limit(retry_after),
        _ => ClientError::api(status.as_u16(), detail),
    }
}
