use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream;

use chatdesk::application::ports::{
    AdmissionDecision, AdmissionGuard, AdmissionGuardError, ChatTransport, LlmClient,
    LlmClientError, LlmTokenStream, ReplyStream, RequestFingerprint, TransportError,
};
use chatdesk::application::services::{ContentValidator, SessionConfig};
use chatdesk::domain::{ConversationTurn, ProfanityLexicon};
use chatdesk::infrastructure::storage::ObjectTurnStore;

pub const APP_ORIGIN: &str = "https://shop.example.com";
pub const PAGE_URL: &str = "https://shop.example.com/support";
pub const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

pub fn validator() -> ContentValidator {
    ContentValidator::new(Arc::new(ProfanityLexicon::default()), 1000)
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        welcome_message: "Welcome! Ask me anything.".to_string(),
        ..SessionConfig::default()
    }
}

pub fn memory_store() -> Arc<ObjectTurnStore> {
    Arc::new(ObjectTurnStore::in_memory())
}

/// What the fake transport does for one `open` call.
pub enum Script {
    Reply(Vec<&'static str>),
    Reject(TransportError),
    BreakAfter(Vec<&'static str>, TransportError),
    Hang,
}

/// Plays back scripted responses and records the history of each request.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl FakeTransport {
    pub fn with(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Vec<ConversationTurn>> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl ChatTransport for FakeTransport {
    async fn open(&self, turns: &[ConversationTurn]) -> Result<ReplyStream, TransportError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Reply(vec!["ok"]));

        match script {
            Script::Reply(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(|c| Ok(c.to_string())),
            ))),
            Script::Reject(error) => Err(error),
            Script::BreakAfter(chunks, error) => {
                let items: Vec<Result<String, TransportError>> = chunks
                    .into_iter()
                    .map(|c| Ok(c.to_string()))
                    .chain(std::iter::once(Err(error)))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Hang => Ok(Box::pin(stream::pending())),
        }
    }
}

/// Guard that always answers the same way and counts how often it was asked.
pub struct StaticGuard {
    decision: AdmissionDecision,
    calls: AtomicUsize,
}

impl StaticGuard {
    pub fn new(decision: AdmissionDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn allowing() -> Arc<Self> {
        Self::new(AdmissionDecision::Allowed { rate_limit: None })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AdmissionGuard for StaticGuard {
    async fn decide(
        &self,
        _fingerprint: &RequestFingerprint,
    ) -> Result<AdmissionDecision, AdmissionGuardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision.clone())
    }
}

pub struct UnavailableGuard;

#[async_trait::async_trait]
impl AdmissionGuard for UnavailableGuard {
    async fn decide(
        &self,
        _fingerprint: &RequestFingerprint,
    ) -> Result<AdmissionDecision, AdmissionGuardError> {
        Err(AdmissionGuardError::Unavailable("decision service down".to_string()))
    }
}

pub struct FailingLlmClient;

#[async_trait::async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete_stream(
        &self,
        _turns: &[ConversationTurn],
    ) -> Result<LlmTokenStream, LlmClientError> {
        Err(LlmClientError::ApiRequestFailed("HTTP 503".to_string()))
    }
}

/// Emits one token and then hangs forever.
pub struct StallingLlmClient;

#[async_trait::async_trait]
impl LlmClient for StallingLlmClient {
    async fn complete_stream(
        &self,
        _turns: &[ConversationTurn],
    ) -> Result<LlmTokenStream, LlmClientError> {
        Ok(Box::pin(futures::StreamExt::chain(
            stream::iter(vec![Ok("Thinking".to_string())]),
            stream::pending(),
        )))
    }
}

pub fn chat_body(turns: &[ConversationTurn]) -> String {
    serde_json::json!({ "messages": turns }).to_string()
}
