//! Rate limit for user-facing error lines.

use std::time::{Duration, Instant};

/// Lets one report through per interval.
#[derive(Debug)]
pub struct ErrorThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ErrorThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a report at `now` should be shown. Suppressed reports do not
    /// extend the window.
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
