use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::application::ports::{
    AdmissionDecision, AdmissionGuard, AdmissionGuardError, DenialReason, RequestFingerprint,
};
use crate::domain::{ConversationTurn, RateLimitInfo, TurnRole};

use super::content_validator::{ContentValidator, ContentViolation};

#[derive(Debug, Deserialize)]
struct ChatPayload {
    messages: Option<Vec<ConversationTurn>>,
}

/// What the gate inspects before touching the request body.
#[derive(Debug, Clone)]
pub struct AdmissionHeaders<'a> {
    pub referer: Option<&'a str>,
    pub origin: Option<&'a str>,
    pub fingerprint: RequestFingerprint,
}

/// Proof that a request passed the origin and guard checks. The body may be
/// read only after this is issued.
#[derive(Debug)]
pub struct Clearance {
    rate_limit: Option<RateLimitInfo>,
}

/// A request that passed every check.
#[derive(Debug, Clone)]
pub struct Admission {
    pub turns: Vec<ConversationTurn>,
    pub rate_limit: Option<RateLimitInfo>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("invalid referer")]
    InvalidReferer,
    #[error("rate limited")]
    RateLimited(RateLimitInfo),
    #[error("bot detected")]
    BotDetected,
    #[error("denied: {0}")]
    Denied(String),
    #[error("invalid request format: {0}")]
    MalformedPayload(String),
    #[error("no messages provided")]
    EmptyConversation,
    #[error("content blocked: {0}")]
    ContentBlocked(ContentViolation),
    #[error("admission guard: {0}")]
    Guard(#[from] AdmissionGuardError),
}

/// Ordered admission checks in front of the model relay. The first failing
/// check decides the response. Headers are screened first; the payload is
/// checked only for cleared requests.
pub struct AdmissionService {
    guard: Arc<dyn AdmissionGuard>,
    validator: ContentValidator,
    app_origin: Url,
}

impl AdmissionService {
    pub fn new(
        guard: Arc<dyn AdmissionGuard>,
        validator: ContentValidator,
        app_origin: &str,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            guard,
            validator,
            app_origin: Url::parse(app_origin)?,
        })
    }

    /// Origin check, then the bot and rate-limit decision.
    pub async fn screen(
        &self,
        headers: AdmissionHeaders<'_>,
    ) -> Result<Clearance, AdmissionError> {
        self.check_origin(headers.referer.or(headers.origin))?;

        match self.guard.decide(&headers.fingerprint).await? {
            AdmissionDecision::Allowed { rate_limit } => Ok(Clearance { rate_limit }),
            AdmissionDecision::Denied(DenialReason::RateLimited(info)) => {
                Err(AdmissionError::RateLimited(info))
            }
            AdmissionDecision::Denied(DenialReason::Bot) => Err(AdmissionError::BotDetected),
            AdmissionDecision::Denied(DenialReason::Other(reason)) => {
                Err(AdmissionError::Denied(reason))
            }
        }
    }

    /// Parses the cleared request's body and validates the latest message.
    pub fn accept_payload(
        &self,
        clearance: Clearance,
        body: &[u8],
    ) -> Result<Admission, AdmissionError> {
        let turns = parse_turns(body)?;

        // Only a trailing user message is new; anything else was checked when sent.
        if let Some(latest) = turns.last().filter(|turn| turn.role == TurnRole::User) {
            self.validator
                .check(&latest.text())
                .map_err(AdmissionError::ContentBlocked)?;
        }

        Ok(Admission {
            turns,
            rate_limit: clearance.rate_limit,
        })
    }

    fn check_origin(&self, declared: Option<&str>) -> Result<(), AdmissionError> {
        let declared = declared
            .and_then(|value| Url::parse(value).ok())
            .ok_or(AdmissionError::InvalidReferer)?;

        if declared.origin() == self.app_origin.origin() {
            Ok(())
        } else {
            Err(AdmissionError::InvalidReferer)
        }
    }
}

fn parse_turns(body: &[u8]) -> Result<Vec<ConversationTurn>, AdmissionError> {
    let payload: ChatPayload = serde_json::from_slice(body)
        .map_err(|e| AdmissionError::MalformedPayload(e.to_string()))?;

    match payload.messages {
        Some(turns) if !turns.is_empty() => Ok(turns),
        _ => Err(AdmissionError::EmptyConversation),
    }
}
