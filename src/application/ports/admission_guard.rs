use async_trait::async_trait;

use crate::domain::RateLimitInfo;

/// What the guard gets to see about a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFingerprint {
    pub client_key: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allowed { rate_limit: Option<RateLimitInfo> },
    Denied(DenialReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    RateLimited(RateLimitInfo),
    Bot,
    Other(String),
}

/// Bot detection and rate limiting, decided outside this crate's logic.
#[async_trait]
pub trait AdmissionGuard: Send + Sync {
    async fn decide(
        &self,
        fingerprint: &RequestFingerprint,
    ) -> Result<AdmissionDecision, AdmissionGuardError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionGuardError {
    #[error("guard unavailable: {0}")]
    Unavailable(String),
}
