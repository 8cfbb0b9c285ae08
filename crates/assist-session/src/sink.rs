//! Outbound seam.

use assist_connection::ConnectionManager;

/// Something that accepts outbound text frames.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink {
    /// Hand `payload` to the transport. `false` means it was not sent.
    fn send(&self, payload: &str) -> bool;
}

impl FrameSink for ConnectionManager {
    fn send(&self, payload: &str) -> bool {
        ConnectionManager::send(self, payload)
    }
}
