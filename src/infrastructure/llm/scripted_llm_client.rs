use std::time::Duration;

use crate::application::ports::{LlmClient, LlmClientError, LlmTokenStream};
use crate::domain::ConversationTurn;

pub const SCAFFOLD_REPLY: &str = "{{choice:Tell me more}}{{choice:Pricing}}\
Thanks for reaching out! This is a scaffold reply, no model was called.\n\n\
{{link:https://example.com/docs|Read the docs}}";

/// Replays a fixed reply word by word. Used in scaffold mode and tests.
pub struct ScriptedLlmClient {
    reply: String,
    token_delay: Duration,
}

impl ScriptedLlmClient {
    pub fn new(reply: impl Into<String>, token_delay: Duration) -> Self {
        Self {
            reply: reply.into(),
            token_delay,
        }
    }
}

impl Default for ScriptedLlmClient {
    fn default() -> Self {
        Self::new(SCAFFOLD_REPLY, Duration::ZERO)
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete_stream(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<LlmTokenStream, LlmClientError> {
        tracing::debug!(turns = turns.len(), "Replaying scripted reply");

        let tokens: Vec<String> = self
            .reply
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        let delay = self.token_delay;

        Ok(Box::pin(async_stream::stream! {
            for token in tokens {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(token);
            }
        }))
    }
}
