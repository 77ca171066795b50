use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_MIN_TIME_BETWEEN_MESSAGES: Duration = Duration::from_secs(2);

/// Client-side cooldown between accepted sends. Not a substitute for the
/// server's rate limiting.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    min_interval: Duration,
    last_sent_at: Option<Instant>,
}

impl ThrottleGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent_at: None,
        }
    }

    pub fn can_send(&self, now: Instant) -> bool {
        match self.last_sent_at {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    pub fn record_send(&mut self, now: Instant) {
        self.last_sent_at = Some(now);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TIME_BETWEEN_MESSAGES)
    }
}
