//! Connection error types.

use thiserror::Error;

/// Transport-level failure on the wire.
///
/// Recorded as the last error; recovery happens through the reconnect policy
/// once the connection reports its close.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect to {url} failed: {reason}")]
    Connect {
        /// Endpoint that was dialed.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// An established connection failed while reading or writing.
    #[error("socket error: {0}")]
    Socket(String),
}

/// Errors returned by [`ConnectionManager`](crate::ConnectionManager) operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// No endpoint is configured, so there is nothing to connect to.
    #[error("no endpoint configured")]
    NoEndpoint,
}
