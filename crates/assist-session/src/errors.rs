//! Local send rejection.

use thiserror::Error;

/// Why a send did not reach the backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    /// Nothing to send: blank text and no role.
    #[error("nothing to send")]
    Empty,

    /// A reply is still pending.
    #[error("waiting for a response")]
    AwaitingResponse,

    /// The connection refused the frame. The optimistic user message stays
    /// in the log.
    #[error("not connected")]
    NotConnected,

    /// The request could not be encoded.
    #[error("encode request: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for SendRejected {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
