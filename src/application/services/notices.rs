use std::time::Duration;

use tokio::time::Instant;

use crate::domain::RateLimitState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    ValidationBlocked,
    RateLimited,
    Transient,
}

/// Dismissable notice shown above the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Banner {
    pub fn new(kind: BannerKind, message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: now + ttl,
        }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Countdown started by a 429. Input stays disabled while it runs.
#[derive(Debug, Clone, Default)]
pub struct RateLimitCountdown {
    until: Option<Instant>,
}

impl RateLimitCountdown {
    pub fn start(&mut self, now: Instant, interval: Duration) {
        self.until = Some(now + interval);
    }

    pub fn clear(&mut self) {
        self.until = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.deadline(now).is_some()
    }

    /// When the countdown ends, while it is still running.
    pub fn deadline(&self, now: Instant) -> Option<Instant> {
        self.until.filter(|until| now < *until)
    }

    pub fn state(&self, now: Instant) -> RateLimitState {
        match self.until {
            Some(until) if now < until => {
                let left = until - now;
                let mut seconds = left.as_secs();
                if left.subsec_nanos() > 0 {
                    seconds += 1;
                }
                RateLimitState {
                    is_limited: true,
                    remaining_seconds: Some(seconds),
                }
            }
            _ => RateLimitState::CLEAR,
        }
    }

    pub fn message(&self, now: Instant) -> String {
        match self.state(now).remaining_seconds {
            Some(seconds) if seconds > 0 => format!(
                "Rate limit exceeded. Please wait {} second{}...",
                seconds,
                if seconds == 1 { "" } else { "s" }
            ),
            _ => "Rate limit exceeded. Please wait...".to_string(),
        }
    }
}
