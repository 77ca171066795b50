use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::LlmClient;
use crate::application::services::AdmissionService;
use crate::presentation::config::LlmSettings;

/// Limits on one relayed reply stream.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    pub keep_alive: Duration,
    pub max_duration: Duration,
}

impl RelayConfig {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            keep_alive: Duration::from_secs(settings.sse_keep_alive_seconds.max(1)),
            max_duration: Duration::from_secs(settings.max_duration_seconds),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

pub struct AppState<L: ?Sized>
where
    L: LlmClient,
{
    pub admission: Arc<AdmissionService>,
    pub llm_client: Arc<L>,
    pub relay: RelayConfig,
    /// Key clients on `X-Forwarded-For`/`X-Real-IP` instead of the socket peer.
    pub trust_proxy_headers: bool,
}

impl<L: ?Sized> Clone for AppState<L>
where
    L: LlmClient,
{
    fn clone(&self) -> Self {
        Self {
            admission: Arc::clone(&self.admission),
            llm_client: Arc::clone(&self.llm_client),
            relay: self.relay,
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}
