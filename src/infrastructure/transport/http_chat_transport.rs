use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, REFERER, RETRY_AFTER, USER_AGENT};
use serde::Serialize;
use url::Url;

use crate::application::ports::{ChatTransport, ReplyStream, TransportError, TransportErrorKind};
use crate::domain::ConversationTurn;
use crate::infrastructure::streaming::{STREAM_DONE, SseDecoder, UiMessageChunk};

const WIDGET_USER_AGENT: &str = concat!("chatdesk-widget/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    messages: &'a [ConversationTurn],
}

/// Posts the conversation to `POST /chat` and decodes the streamed reply.
pub struct HttpChatTransport {
    client: Client,
    endpoint: Url,
    page_url: String,
}

impl HttpChatTransport {
    /// `page_url` is sent as the referer, as a browser embedding the widget would.
    pub fn new(server_url: &str, page_url: impl Into<String>) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(server_url)?.join("chat")?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            page_url: page_url.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, turns: &[ConversationTurn]) -> Result<ReplyStream, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(REFERER, &self.page_url)
            .header(USER_AGENT, WIDGET_USER_AGENT)
            .json(&ChatRequestBody { messages: turns })
            .send()
            .await
            .map_err(|e| TransportError::transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let mut error = TransportError::from_status(status.as_u16(), body);
            if let Some(retry_after) = retry_after {
                error = error.with_retry_after(retry_after);
            }
            return Err(error);
        }

        let mut bytes = response.bytes_stream();
        let reply = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut finished = false;

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(TransportError::transient(e.to_string()));
                        return;
                    }
                };

                for data in decoder.push(&chunk) {
                    if data.trim() == STREAM_DONE {
                        return;
                    }
                    match serde_json::from_str::<UiMessageChunk>(&data) {
                        Ok(UiMessageChunk::TextDelta { delta, .. }) => yield Ok(delta),
                        Ok(UiMessageChunk::Error { error_text }) => {
                            yield Err(TransportError::new(TransportErrorKind::Transient, error_text));
                            return;
                        }
                        Ok(UiMessageChunk::Finish) => finished = true,
                        Ok(_) => {}
                        Err(e) => tracing::debug!(error = %e, "Skipping unparseable stream chunk"),
                    }
                }
            }

            let trailing_done = decoder
                .finish()
                .is_some_and(|data| data.trim() == STREAM_DONE);

            // A reply cut off before `finish` or `[DONE]` is incomplete.
            if !finished && !trailing_done {
                yield Err(TransportError::transient("reply stream ended before completion"));
            }
        };

        Ok(Box::pin(reply))
    }
}

/// Seconds from `Retry-After`, falling back to the rate-limit reset header.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    [RETRY_AFTER.as_str(), RATE_LIMIT_RESET_HEADER]
        .into_iter()
        .find_map(|name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        })
        .map(Duration::from_secs)
}
