//! Reconnect bookkeeping.
//!
//! The attempt counter and the pending timer live in one value owned by the
//! connection manager. Every transition is a plain method call, so the policy
//! is testable without a runtime.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// What to do after a close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reconnect after `delay`; `attempt` is already counted.
    Retry {
        /// 1-based attempt number.
        attempt: u32,
        /// Fixed delay before the attempt.
        delay: Duration,
    },
    /// The close was expected (manual disconnect or no endpoint).
    Suppressed,
    /// The attempt budget is spent.
    Exhausted,
}

/// Attempt counter plus the pending reconnect timer.
#[derive(Debug)]
pub struct ReconnectState {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    timer: Option<CancellationToken>,
}

impl ReconnectState {
    /// Fresh state with no attempts made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            delay,
            timer: None,
        }
    }

    /// Attempts made since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed reconnect delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a reconnect timer is pending.
    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether no automatic attempts remain.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Decide how to react to a close. The counter is bumped before a retry
    /// is handed out.
    pub fn on_unexpected_close(&mut self, manual: bool, has_url: bool) -> ReconnectDecision {
        if manual || !has_url {
            return ReconnectDecision::Suppressed;
        }
        if self.is_exhausted() {
            return ReconnectDecision::Exhausted;
        }
        self.attempt += 1;
        ReconnectDecision::Retry {
            attempt: self.attempt,
            delay: self.delay,
        }
    }

    /// Record the timer for a scheduled retry, cancelling any previous one.
    pub fn arm(&mut self, timer: CancellationToken) {
        let _ = self.cancel();
        self.timer = Some(timer);
    }

    /// Cancel the pending timer. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    /// The timer elapsed; forget it without cancelling.
    pub fn fire(&mut self) {
        self.timer = None;
    }

    /// Zero the counter (successful open, or a new endpoint).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
