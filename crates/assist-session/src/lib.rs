//! # assist-session
//!
//! The conversation side of the client. [`ChatSession`] deduplicates inbound
//! frames, classifies them, and folds them into ordered state; outbound
//! intents (free text, quick actions, role selection) leave through a
//! [`FrameSink`], normally the connection manager.

#![deny(unsafe_code)]

pub mod composer;
pub mod dedup;
pub mod errors;
pub mod reducer;
pub mod sink;

pub use composer::ComposerStatus;
pub use dedup::FingerprintWindow;
pub use errors::SendRejected;
pub use reducer::{ChatSession, IngestOutcome, SessionState};
pub use sink::FrameSink;
