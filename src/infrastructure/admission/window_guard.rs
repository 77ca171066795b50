use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use tokio::time::Instant;

use crate::application::ports::{
    AdmissionDecision, AdmissionGuard, AdmissionGuardError, DenialReason, RequestFingerprint,
};
use crate::domain::RateLimitInfo;

static AUTOMATED_USER_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(bot\b|crawl|spider|slurp|curl/|wget/|python-requests|python-urllib|httpclient|go-http-client|headless|phantomjs|scrapy|node-fetch)",
    )
    .unwrap()
});

/// Windows beyond this many tracked clients trigger a sweep of expired ones.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    count: u32,
    started_at: Instant,
}

/// In-process stand-in for a hosted bot and rate-limit service: a fixed
/// window counter per client key plus a user-agent heuristic.
pub struct FixedWindowGuard {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
    block_automated_clients: bool,
}

impl FixedWindowGuard {
    /// `max_requests == 0` disables rate limiting.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
            block_automated_clients: true,
        }
    }

    pub fn allow_automated_clients(mut self) -> Self {
        self.block_automated_clients = false;
        self
    }

    fn check_window(&self, client_key: &str, now: Instant) -> AdmissionDecision {
        if self.max_requests == 0 {
            return AdmissionDecision::Allowed { rate_limit: None };
        }

        let mut windows = self.windows.lock();
        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started_at) < window);
        }

        let entry = windows.entry(client_key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });
        if now.saturating_duration_since(entry.started_at) >= self.window {
            *entry = Window {
                count: 0,
                started_at: now,
            };
        }

        let reset = self
            .window
            .saturating_sub(now.saturating_duration_since(entry.started_at));

        if entry.count >= self.max_requests {
            return AdmissionDecision::Denied(DenialReason::RateLimited(RateLimitInfo {
                limit: self.max_requests,
                remaining: 0,
                reset,
            }));
        }

        entry.count += 1;
        AdmissionDecision::Allowed {
            rate_limit: Some(RateLimitInfo {
                limit: self.max_requests,
                remaining: self.max_requests - entry.count,
                reset,
            }),
        }
    }
}

#[async_trait]
impl AdmissionGuard for FixedWindowGuard {
    async fn decide(
        &self,
        fingerprint: &RequestFingerprint,
    ) -> Result<AdmissionDecision, AdmissionGuardError> {
        if self.block_automated_clients && is_automated_client(fingerprint.user_agent.as_deref()) {
            tracing::info!(client = %fingerprint.client_key, "Automated client denied");
            return Ok(AdmissionDecision::Denied(DenialReason::Bot));
        }

        let decision = self.check_window(&fingerprint.client_key, Instant::now());
        if let AdmissionDecision::Denied(DenialReason::RateLimited(info)) = &decision {
            tracing::info!(
                client = %fingerprint.client_key,
                reset_seconds = info.reset_seconds(),
                "Client rate limited"
            );
        }
        Ok(decision)
    }
}

/// Clients without a user agent, or announcing a crawler or scripting tool.
pub fn is_automated_client(user_agent: Option<&str>) -> bool {
    match user_agent.map(str::trim) {
        None | Some("") => true,
        Some(agent) => AUTOMATED_USER_AGENT.is_match(agent),
    }
}
