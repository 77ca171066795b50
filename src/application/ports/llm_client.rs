use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::domain::ConversationTurn;

pub type LlmTokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmClientError>> + Send>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Opens a streamed reply to the conversation. Errors returned here happen
    /// before any token was produced; errors inside the stream happen after.
    async fn complete_stream(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<LlmTokenStream, LlmClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("rate limited")]
    RateLimited,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("configuration: {0}")]
    Configuration(String),
}
