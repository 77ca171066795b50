use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::domain::ConversationTurn;

/// Text deltas of one assistant reply, in arrival order.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, turns: &[ConversationTurn]) -> Result<ReplyStream, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Validation,
    RateLimit,
    Forbidden,
    Transient,
    Fatal,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::Forbidden => "forbidden",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
        }
    }

    /// Maps an HTTP failure status onto the error taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 413 | 415 | 422 => Self::Validation,
            429 => Self::RateLimit,
            401 | 403 => Self::Forbidden,
            408 | 502 | 503 | 504 => Self::Transient,
            _ => Self::Fatal,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::from_status(status),
            status: Some(status),
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Transient, message)
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}
