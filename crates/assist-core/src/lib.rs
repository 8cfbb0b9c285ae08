//! # assist-core
//!
//! Shared vocabulary for the assist chat client.
//!
//! Every other assist crate depends on these types:
//!
//! - **Messages**: [`Message`] log entries with ascending [`MessageId`]s
//! - **Media**: [`MediaEmbedding`] attachments and their inferred [`MediaKind`]
//! - **Actions**: backend-supplied buttons, selectable [`Role`]s, and the [`Mode`]
//! - **Envelopes**: the outbound [`Request`] and the inbound classifier producing [`Inbound`]
//! - **Frames**: raw inbound payloads with arrival time and dedup [`Fingerprint`]
//! - **Identity**: the [`IdentityProvider`] seam and Telegram launch data parsing

#![deny(unsafe_code)]

pub mod actions;
pub mod envelope;
pub mod errors;
pub mod frame;
pub mod identity;
mod lenient;
pub mod media;
pub mod messages;

pub use actions::{Action, ActionKind, Mode, Role};
pub use envelope::{AnswerFrame, BatchFrame, Inbound, Request, TaskId, classify};
pub use errors::{IdentityError, ProtocolError};
pub use frame::{Fingerprint, Frame};
pub use identity::{
    FileIdentityStore, Identity, IdentityProvider, MemoryIdentityStore, TelegramUser,
    bootstrap_identity,
};
pub use media::{MediaEmbedding, MediaItem, MediaKind};
pub use messages::{Message, MessageId, Owner, sort_messages};
