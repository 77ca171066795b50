use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use tokio::time::{Instant, sleep_until};

use crate::application::ports::LlmTokenStream;
use crate::infrastructure::streaming::{STREAM_DONE, UiMessageChunk};

const MAX_DURATION_MESSAGE: &str = "Response exceeded the maximum duration";
const STREAM_FAILED_MESSAGE: &str = "The assistant stopped responding. Please try again.";

fn event(chunk: UiMessageChunk) -> Result<Event, Infallible> {
    Ok(Event::default().data(chunk.to_json()))
}

/// Re-frames model tokens as UI message stream events. The stream ends with an
/// `error` chunk if the provider fails or `max_duration` elapses.
pub fn ui_message_events(
    mut tokens: LlmTokenStream,
    max_duration: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    async_stream::stream! {
        let message_id = uuid::Uuid::new_v4().to_string();
        let text_id = format!("text-{}", uuid::Uuid::new_v4());
        let deadline = Instant::now() + max_duration;

        yield event(UiMessageChunk::Start { message_id: Some(message_id) });
        yield event(UiMessageChunk::StartStep);
        yield event(UiMessageChunk::TextStart { id: text_id.clone() });

        let mut delivered = 0usize;
        loop {
            tokio::select! {
                biased;
                token = tokens.next() => match token {
                    Some(Ok(delta)) => {
                        delivered += delta.len();
                        yield event(UiMessageChunk::TextDelta { id: text_id.clone(), delta });
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, delivered, "Model stream failed");
                        yield event(UiMessageChunk::Error { error_text: STREAM_FAILED_MESSAGE.to_string() });
                        break;
                    }
                    None => {
                        tracing::debug!(delivered, "Model stream finished");
                        yield event(UiMessageChunk::TextEnd { id: text_id.clone() });
                        yield event(UiMessageChunk::FinishStep);
                        yield event(UiMessageChunk::Finish);
                        break;
                    }
                },
                _ = sleep_until(deadline) => {
                    tracing::warn!(delivered, "Model stream exceeded maximum duration");
                    yield event(UiMessageChunk::Error { error_text: MAX_DURATION_MESSAGE.to_string() });
                    break;
                }
            }
        }

        yield Ok(Event::default().data(STREAM_DONE));
    }
}
