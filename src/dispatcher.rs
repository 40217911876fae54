use async_trait::async_trait;

use crate::client::Result;

/// Delivers a text message to the configured chat
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, text: &str) -> Result<()>;
}
