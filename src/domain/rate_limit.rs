use std::time::Duration;

use serde::Serialize;

/// Quota snapshot reported by the admission guard for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: Duration,
}

impl RateLimitInfo {
    /// Seconds until the window resets, rounded up so a client never retries early.
    pub fn reset_seconds(&self) -> u64 {
        let secs = self.reset.as_secs();
        if self.reset.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// What the widget shows while a server-side rate limit is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    pub is_limited: bool,
    pub remaining_seconds: Option<u64>,
}

impl RateLimitState {
    pub const CLEAR: RateLimitState = RateLimitState {
        is_limited: false,
        remaining_seconds: None,
    };
}
