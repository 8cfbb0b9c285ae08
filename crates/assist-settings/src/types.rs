//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON files are accepted; missing fields keep their compiled defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "connection": { "reconnectDelayMs": 3000 },
///   "media": { "baseUrl": "https://media.example" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistSettings {
    /// Real-time connection settings.
    pub connection: ConnectionSettings,
    /// Conversation reducer settings.
    pub session: SessionSettings,
    /// Media resolution settings.
    pub media: MediaSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl AssistSettings {
    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.connection.endpoint_template.contains("{user_id}") {
            return Err(SettingsError::InvalidValue(
                "connection.endpointTemplate must contain {user_id}".into(),
            ));
        }
        if self.connection.outbound_buffer == 0 || self.connection.event_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "connection buffers must be non-zero".into(),
            ));
        }
        if self.session.fingerprint_prefix == 0 {
            return Err(SettingsError::InvalidValue(
                "session.fingerprintPrefix must be non-zero".into(),
            ));
        }
        if self.session.dedup_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "session.dedupCapacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Connection manager settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// Per-user endpoint; `{user_id}` is substituted.
    pub endpoint_template: String,
    /// Automatic reconnects after unexpected closes before giving up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay before each automatic reconnect, in milliseconds.
    ///
    /// The client waits longer than the library default of one second.
    pub reconnect_delay_ms: u64,
    /// Outbound frames buffered per connection.
    pub outbound_buffer: usize,
    /// Connection events buffered per subscriber.
    pub event_capacity: usize,
}

impl ConnectionSettings {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint_template: "wss://admin-helper.ewaproduct.com/ws/notifications/{user_id}/"
                .to_string(),
            max_reconnect_attempts: 3,
            reconnect_delay_ms: 3000,
            outbound_buffer: 64,
            event_capacity: 256,
        }
    }
}

/// Session reducer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Payload characters folded into the dedup fingerprint.
    pub fingerprint_prefix: usize,
    /// Most recent fingerprints remembered for dedup.
    pub dedup_capacity: usize,
    /// Button command that switches the conversation to skynet mode.
    pub escalation_command: String,
    /// Button command that returns to chat mode.
    pub chat_command: String,
    /// Name shown when the identity has none.
    pub default_display_name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fingerprint_prefix: 20,
            dedup_capacity: 1024,
            escalation_command: "/ОЦЕНИТЬ".to_string(),
            chat_command: "/Тренажер".to_string(),
            default_display_name: "Пользователь".to_string(),
        }
    }
}

/// Media settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaSettings {
    /// Host that relative `file` references resolve against.
    pub base_url: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            base_url: "https://admin-helper.ewaproduct.com".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`RUST_LOG` wins when set).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
