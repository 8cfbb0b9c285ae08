//! Error types for payload decoding and identity handling.

use thiserror::Error;

/// An inbound payload could not be turned into a recognized envelope.
///
/// Protocol errors are per-frame: the offending frame is discarded and the
/// connection and session carry on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload is JSON but a recognized envelope has malformed fields.
    #[error("malformed {envelope} envelope: {reason}")]
    Shape {
        /// Which envelope the payload was classified as.
        envelope: &'static str,
        /// Decoder message.
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn shape(envelope: &'static str, err: &serde_json::Error) -> Self {
        Self::Shape {
            envelope,
            reason: err.to_string(),
        }
    }
}

/// Errors from the identity collaborator.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Neither fresh launch data nor a stored identity is available.
    #[error("no init data available")]
    NoInitData,
    /// Launch data was present but could not be parsed.
    #[error("invalid init data: {0}")]
    InvalidInitData(String),
    /// Reading or writing the identity store failed.
    #[error("identity store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The stored identity is not valid JSON.
    #[error("identity store contains invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
