//! Inbound frames and their dedup fingerprints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of payload characters folded into a [`Fingerprint`].
pub const DEFAULT_FINGERPRINT_PREFIX: usize = 20;

/// One inbound unit of data: the raw payload and when it arrived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Raw UTF-8 payload.
    pub data: String,
    /// Arrival time.
    pub received_at: DateTime<Utc>,
}

impl Frame {
    /// A frame arriving now.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self::at(data, Utc::now())
    }

    /// A frame with an explicit arrival time.
    #[must_use]
    pub fn at(data: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            data: data.into(),
            received_at,
        }
    }

    /// Dedup key from the arrival time and the first `prefix_chars` characters.
    pub fn fingerprint(&self, prefix_chars: usize) -> Fingerprint {
        Fingerprint {
            received_at_micros: self.received_at.timestamp_micros(),
            prefix: self.data.chars().take(prefix_chars).collect(),
        }
    }
}

/// Dedup key of a [`Frame`].
///
/// Two deliveries of the same frame share a fingerprint; frames that differ
/// in arrival time or payload prefix do not.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    received_at_micros: i64,
    prefix: String,
}
