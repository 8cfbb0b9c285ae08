//! Lifecycle state, observable events, and tuning for a connection.

use std::fmt;
use std::time::Duration;

use assist_core::Frame;
use assist_settings::ConnectionSettings;

use crate::errors::TransportError;

/// Normal closure, sent on manual disconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Reported when the peer vanished without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close reason sent on manual disconnect.
pub const MANUAL_DISCONNECT_REASON: &str = "Manual disconnect";

/// Lifecycle of the managed connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No endpoint configured.
    #[default]
    Idle,
    /// Dialing the endpoint.
    Connecting,
    /// Frames can be sent and received.
    Open,
    /// A close handshake is in progress.
    Closing,
    /// Not connected; a reconnect may be scheduled.
    Closed,
}

impl ConnectionState {
    /// Wire-style lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// Whether a connection is open or being established.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications delivered through
/// [`ConnectionManager::subscribe`](crate::ConnectionManager::subscribe).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The lifecycle state changed.
    StateChanged(ConnectionState),
    /// A frame arrived.
    Frame(Frame),
    /// A transport error was recorded.
    Error(TransportError),
    /// An automatic reconnect will be attempted after `delay`.
    ReconnectScheduled {
        /// 1-based attempt number.
        attempt: u32,
        /// Time until the attempt.
        delay: Duration,
    },
    /// The attempt budget is spent; only a manual connect resumes.
    ReconnectExhausted,
}

/// Reconnect and buffering parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Automatic reconnects allowed between successful opens.
    pub max_reconnect_attempts: u32,
    /// Fixed delay before each automatic reconnect.
    pub reconnect_delay: Duration,
    /// Outbound frames buffered per connection.
    pub outbound_buffer: usize,
    /// Events buffered per subscriber.
    pub event_capacity: usize,
}

impl ConnectionConfig {
    /// Same config with a different reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Same config with a different attempt budget.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 3,
            reconnect_delay: Duration::from_millis(1000),
            outbound_buffer: 64,
            event_capacity: 256,
        }
    }
}

impl From<&ConnectionSettings> for ConnectionConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        Self {
            max_reconnect_attempts: settings.max_reconnect_attempts,
            reconnect_delay: settings.reconnect_delay(),
            outbound_buffer: settings.outbound_buffer.max(1),
            event_capacity: settings.event_capacity.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_default_delay_is_one_second() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.outbound_buffer, 64);
    }

    #[test]
    fn from_settings() {
        let config = ConnectionConfig::from(&ConnectionSettings::default());
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn zero_buffers_are_clamped() {
        let settings = ConnectionSettings {
            outbound_buffer: 0,
            event_capacity: 0,
            ..ConnectionSettings::default()
        };
        let config = ConnectionConfig::from(&settings);
        assert_eq!(config.outbound_buffer, 1);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn builders() {
        let config = ConnectionConfig::default()
            .with_reconnect_delay(Duration::from_secs(3))
            .with_max_reconnect_attempts(5);
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn live_states() {
        assert!(ConnectionState::Connecting.is_live());
        assert!(ConnectionState::Open.is_live());
        assert!(!ConnectionState::Closing.is_live());
        assert!(!ConnectionState::Idle.is_live());
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }
}
