mod admission_guard;
mod chat_transport;
mod llm_client;
mod turn_store;

pub use admission_guard::{
    AdmissionDecision, AdmissionGuard, AdmissionGuardError, DenialReason, RequestFingerprint,
};
pub use chat_transport::{ChatTransport, ReplyStream, TransportError, TransportErrorKind};
pub use llm_client::{LlmClient, LlmClientError, LlmTokenStream};
pub use turn_store::{TurnStore, TurnStoreError};
