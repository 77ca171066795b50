mod admission_service;
mod chat_session;
mod content_validator;
mod directive_parser;
mod message_store;
mod notices;
mod throttle_gate;

pub use admission_service::{
    Admission, AdmissionError, AdmissionHeaders, AdmissionService, Clearance,
};
pub use chat_session::{
    ChatSession, IgnoreReason, LOCAL_BLOCKED_MESSAGE, SERVER_BLOCKED_MESSAGE, SendOutcome,
    SessionConfig, SessionEvent, SessionStatus, TRANSIENT_ERROR_MESSAGE,
};
pub use content_validator::{
    ContentValidator, ContentViolation, DEFAULT_MAX_MESSAGE_CHARS, SPAM_REPEAT_THRESHOLD,
};
pub use directive_parser::{parse_directives, parse_streaming};
pub use message_store::{DEFAULT_STORAGE_KEY, MessageStore};
pub use notices::{Banner, BannerKind, RateLimitCountdown};
pub use throttle_gate::{DEFAULT_MIN_TIME_BETWEEN_MESSAGES, ThrottleGate};
