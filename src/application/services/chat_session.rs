use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ChatTransport, ReplyStream, TransportError, TransportErrorKind, TurnStore,
};
use crate::domain::{ConversationTurn, ParsedReply, RateLimitState, TurnId};

use super::content_validator::{ContentValidator, ContentViolation};
use super::directive_parser::parse_streaming;
use super::message_store::{DEFAULT_STORAGE_KEY, MessageStore};
use super::notices::{Banner, BannerKind, RateLimitCountdown};
use super::throttle_gate::{DEFAULT_MIN_TIME_BETWEEN_MESSAGES, ThrottleGate};

pub const LOCAL_BLOCKED_MESSAGE: &str = "Message blocked - inappropriate/spam";
pub const SERVER_BLOCKED_MESSAGE: &str =
    "Message blocked (inappropriate content, spam, or exceeding length)";
pub const TRANSIENT_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub welcome_message: String,
    pub storage_key: String,
    pub min_time_between_messages: Duration,
    /// Countdown used when a 429 carries no `Retry-After`.
    pub rate_limit_interval: Duration,
    pub max_message_length: usize,
    pub banner_duration: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Hi! How can I help you today?".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            min_time_between_messages: DEFAULT_MIN_TIME_BETWEEN_MESSAGES,
            rate_limit_interval: Duration::from_secs(30),
            max_message_length: 500,
            banner_duration: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Submitted,
    Streaming,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// Prose and buttons of the reply received so far.
    PartialReply(ParsedReply),
    TurnAppended(ConversationTurn),
    BannerRaised(Banner),
    RateLimited { seconds: u64 },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Closed,
    Busy,
    Blank,
    TooLong,
    Throttled,
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply settled; `reply` is `None` when the model produced no text.
    Delivered { reply: Option<TurnId> },
    Ignored(IgnoreReason),
    Blocked(ContentViolation),
    Failed(TransportErrorKind),
    Cancelled,
}

enum StreamStep {
    Delta(String),
    Finished,
    Failed(TransportError),
    Cancelled,
}

/// Drives one widget's conversation: gating, the request lifecycle, banners
/// and the rate-limit countdown.
pub struct ChatSession {
    config: SessionConfig,
    transport: Arc<dyn ChatTransport>,
    messages: MessageStore,
    validator: ContentValidator,
    throttle: ThrottleGate,
    countdown: RateLimitCountdown,
    banner: Option<Banner>,
    status: SessionStatus,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    cancel: CancellationToken,
}

impl ChatSession {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn TurnStore>,
        validator: ContentValidator,
    ) -> Self {
        let messages = MessageStore::new(
            store,
            config.storage_key.clone(),
            config.welcome_message.clone(),
        );
        let throttle = ThrottleGate::new(config.min_time_between_messages);

        Self {
            config,
            transport,
            messages,
            validator,
            throttle,
            countdown: RateLimitCountdown::default(),
            banner: None,
            status: SessionStatus::Idle,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Restores persisted history. Call once when the widget opens.
    pub async fn mount(&mut self) -> &[ConversationTurn] {
        self.messages.restore().await
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        self.messages.turns()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.countdown.state(Instant::now())
    }

    pub fn is_input_enabled(&self) -> bool {
        !self.is_closed()
            && !self.countdown.is_active(Instant::now())
            && matches!(
                self.status,
                SessionStatus::Idle | SessionStatus::Ready | SessionStatus::Error
            )
    }

    /// The banner to display now, if any. The rate-limit countdown takes
    /// precedence over other notices.
    pub fn banner(&self) -> Option<Banner> {
        let now = Instant::now();
        if let Some(until) = self.countdown.deadline(now) {
            return Some(Banner {
                kind: BannerKind::RateLimited,
                message: self.countdown.message(now),
                expires_at: until,
            });
        }
        self.banner.clone().filter(|banner| banner.is_active(now))
    }

    /// Token that closes the session when cancelled, usable from another task.
    pub fn close_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn reset(&mut self) {
        self.countdown.clear();
        self.banner = None;
        self.messages.reset().await;
        self.emit(SessionEvent::Reset);
    }

    /// Sends the label of a clicked choice button.
    pub async fn choose(&mut self, label: &str) -> SendOutcome {
        self.send(label).await
    }

    pub async fn send(&mut self, text: &str) -> SendOutcome {
        let now = Instant::now();

        if let Some(reason) = self.ignore_reason(text, now) {
            tracing::debug!(?reason, "Dropping send");
            return SendOutcome::Ignored(reason);
        }

        if let Err(violation) = self.validator.check(text) {
            tracing::info!(%violation, "Message blocked before sending");
            self.raise_banner(BannerKind::ValidationBlocked, LOCAL_BLOCKED_MESSAGE, now);
            return SendOutcome::Blocked(violation);
        }

        self.throttle.record_send(now);
        let user_turn = ConversationTurn::user(text);
        self.messages.append(user_turn.clone()).await;
        self.emit(SessionEvent::TurnAppended(user_turn));
        self.set_status(SessionStatus::Submitted);

        let deadline = now + self.config.request_timeout;
        let stream = match self.open_stream(deadline).await {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return self.fail(e),
            None => return self.abandon(),
        };

        self.consume(stream, deadline).await
    }

    fn ignore_reason(&self, text: &str, now: Instant) -> Option<IgnoreReason> {
        if self.is_closed() {
            return Some(IgnoreReason::Closed);
        }
        if matches!(
            self.status,
            SessionStatus::Submitted | SessionStatus::Streaming
        ) {
            return Some(IgnoreReason::Busy);
        }
        if text.trim().is_empty() {
            return Some(IgnoreReason::Blank);
        }
        if text.chars().count() > self.config.max_message_length {
            return Some(IgnoreReason::TooLong);
        }
        if !self.throttle.can_send(now) {
            return Some(IgnoreReason::Throttled);
        }
        if self.countdown.is_active(now) {
            return Some(IgnoreReason::RateLimited);
        }
        None
    }

    async fn open_stream(
        &self,
        deadline: Instant,
    ) -> Option<Result<ReplyStream, TransportError>> {
        let transport = Arc::clone(&self.transport);
        let history = self.messages.turns().to_vec();
        let cancel = self.cancel.clone();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = sleep_until(deadline) => Some(Err(TransportError::transient("request timed out"))),
            result = transport.open(&history) => Some(result),
        }
    }

    async fn consume(&mut self, mut stream: ReplyStream, deadline: Instant) -> SendOutcome {
        let cancel = self.cancel.clone();
        let mut buffer = String::new();

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => StreamStep::Cancelled,
                _ = sleep_until(deadline) => {
                    StreamStep::Failed(TransportError::transient("reply exceeded time budget"))
                }
                item = stream.next() => match item {
                    Some(Ok(delta)) => StreamStep::Delta(delta),
                    Some(Err(e)) => StreamStep::Failed(e),
                    None => StreamStep::Finished,
                },
            };

            match step {
                StreamStep::Delta(delta) => {
                    if self.status == SessionStatus::Submitted {
                        self.set_status(SessionStatus::Streaming);
                    }
                    buffer.push_str(&delta);
                    self.emit(SessionEvent::PartialReply(parse_streaming(&buffer)));
                }
                StreamStep::Finished => return self.settle(buffer).await,
                // Partial text of a failed reply is dropped.
                StreamStep::Failed(e) => return self.fail(e),
                StreamStep::Cancelled => return self.abandon(),
            }
        }
    }

    async fn settle(&mut self, text: String) -> SendOutcome {
        let reply = if text.trim().is_empty() {
            tracing::warn!("Reply finished without text");
            None
        } else {
            let turn = ConversationTurn::assistant(text);
            let id = turn.id.clone();
            self.messages.append(turn.clone()).await;
            self.emit(SessionEvent::TurnAppended(turn));
            Some(id)
        };

        tracing::debug!(turns = self.messages.len(), "Reply settled");
        self.set_status(SessionStatus::Ready);
        self.set_status(SessionStatus::Idle);
        SendOutcome::Delivered { reply }
    }

    fn fail(&mut self, error: TransportError) -> SendOutcome {
        let now = Instant::now();
        tracing::warn!(
            kind = %error.kind,
            status = ?error.status,
            error = %error.message,
            "Chat request failed"
        );

        match error.kind {
            TransportErrorKind::Validation => {
                self.raise_banner(BannerKind::ValidationBlocked, SERVER_BLOCKED_MESSAGE, now);
            }
            TransportErrorKind::RateLimit => {
                let interval = error.retry_after.unwrap_or(self.config.rate_limit_interval);
                self.countdown.start(now, interval);
                self.banner = None;
                let seconds = self.countdown.state(now).remaining_seconds.unwrap_or(0);
                self.emit(SessionEvent::RateLimited { seconds });
            }
            _ => self.raise_banner(BannerKind::Transient, TRANSIENT_ERROR_MESSAGE, now),
        }

        self.set_status(SessionStatus::Error);
        self.set_status(SessionStatus::Idle);
        SendOutcome::Failed(error.kind)
    }

    fn abandon(&mut self) -> SendOutcome {
        tracing::debug!("Session closed with a reply in flight");
        self.set_status(SessionStatus::Idle);
        SendOutcome::Cancelled
    }

    fn raise_banner(&mut self, kind: BannerKind, message: &str, now: Instant) {
        let banner = Banner::new(kind, message, now, self.config.banner_duration);
        self.banner = Some(banner.clone());
        self.emit(SessionEvent::BannerRaised(banner));
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.emit(SessionEvent::StatusChanged(status));
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
