//! Conversation log entries.
//!
//! Messages are append-only. The displayed log is always sorted ascending by
//! [`MessageId`], which is the creation time in milliseconds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaEmbedding;

/// Numeric message identity (creation-time milliseconds).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Id derived from a creation timestamp.
    #[must_use]
    pub fn from_time(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who authored a message.
///
/// Anything the backend sends other than `"user"` is shown as a system
/// message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    /// Typed or selected by the local user.
    User,
    /// Produced by the backend assistant.
    #[serde(other)]
    System,
}

/// One entry in the conversation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Ordering key.
    pub id: MessageId,
    /// Author.
    pub owner: Owner,
    /// Body text; null decodes as empty.
    #[serde(default, deserialize_with = "crate::lenient::text")]
    pub message: String,
    /// Attached media, if any.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::lenient::optional"
    )]
    pub embedding: Option<MediaEmbedding>,
    /// Creation time; unparseable values decode as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::lenient::timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// A message typed or selected by the user.
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: Owner::User,
            message: text.into(),
            embedding: None,
            created_at: Some(created_at),
        }
    }

    /// An assistant reply with optional media.
    #[must_use]
    pub fn system(
        id: MessageId,
        text: impl Into<String>,
        embedding: Option<MediaEmbedding>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner: Owner::System,
            message: text.into(),
            embedding,
            created_at: Some(created_at),
        }
    }

    /// Whether the local user authored this message.
    pub fn is_user(&self) -> bool {
        self.owner == Owner::User
    }
}

/// Sort a log ascending by id. Equal ids keep their relative order.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.id);
}
