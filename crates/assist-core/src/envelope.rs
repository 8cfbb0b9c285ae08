//! Wire envelopes.
//!
//! Outbound requests are `{prompt, role_id?}`. Inbound payloads carry no
//! type tag; [`classify`] decides by field presence, checked in order:
//!
//! 1. `status: "accepted"` → [`Inbound::Accepted`]
//! 2. an `answer` field (even empty or null) → [`Inbound::Answer`]
//! 3. a `messages` array → [`Inbound::Batch`]
//! 4. anything else → [`Inbound::Unknown`]

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actions::{Mode, Role};
use crate::errors::ProtocolError;
use crate::lenient;
use crate::media::MediaEmbedding;
use crate::messages::Message;

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Request envelope sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Free text, or the role display name for a role selection.
    pub prompt: String,
    /// Selected role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
}

impl Request {
    /// A free-text prompt.
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            role_id: None,
        }
    }

    /// A role selection.
    #[must_use]
    pub fn role(role: &Role) -> Self {
        Self {
            prompt: role.name.clone(),
            role_id: Some(role.id),
        }
    }

    /// Serialize to the JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task id
// ─────────────────────────────────────────────────────────────────────────────

/// Server-assigned correlation id linking an acknowledgement to its answer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    /// Numeric id.
    Int(i64),
    /// Opaque string id.
    Str(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => n.fmt(f),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// An assistant reply.
///
/// `answer` and `task_id` are decoded strictly; the auxiliary fields fall
/// back to absent (or skip bad items) instead of failing the frame.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnswerFrame {
    /// Reply text; present-but-null decodes as empty.
    #[serde(default, deserialize_with = "lenient::text")]
    pub answer: String,
    /// Correlation id, if the backend supplied one.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    /// Replacement button set.
    #[serde(default, deserialize_with = "lenient::optional_list")]
    pub buttons: Option<Vec<String>>,
    /// Replacement role set.
    #[serde(default, deserialize_with = "lenient::optional_list")]
    pub roles: Option<Vec<Role>>,
    /// Raw explicit mode; see [`AnswerFrame::explicit_mode`].
    #[serde(default, deserialize_with = "lenient::optional")]
    pub mode: Option<String>,
    /// Attached media.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub embedding: Option<MediaEmbedding>,
}

impl AnswerFrame {
    /// The explicit mode, if it is a recognized value.
    pub fn explicit_mode(&self) -> Option<Mode> {
        self.mode.as_deref().and_then(Mode::parse)
    }
}

/// A session replay: the full message history plus the current actions.
///
/// History entries that do not decode are skipped, not fatal.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BatchFrame {
    /// Full history, in any order.
    #[serde(deserialize_with = "lenient::list")]
    pub messages: Vec<Message>,
    /// Button set; absent means unchanged.
    #[serde(default, deserialize_with = "lenient::optional_list")]
    pub buttons: Option<Vec<String>>,
    /// Role set; absent means unchanged.
    #[serde(default, deserialize_with = "lenient::optional_list")]
    pub roles: Option<Vec<Role>>,
    /// Raw explicit mode.
    #[serde(default, deserialize_with = "lenient::optional")]
    pub mode: Option<String>,
}

impl BatchFrame {
    /// The explicit mode, if it is a recognized value.
    pub fn explicit_mode(&self) -> Option<Mode> {
        self.mode.as_deref().and_then(Mode::parse)
    }
}

/// A classified inbound payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// The backend accepted a request and is working on it.
    Accepted {
        /// Correlation id for the eventual answer.
        task_id: Option<TaskId>,
    },
    /// An assistant reply.
    Answer(AnswerFrame),
    /// A full history replay.
    Batch(BatchFrame),
    /// Valid JSON of no recognized shape.
    Unknown,
}

impl Inbound {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Answer(_) => "answer",
            Self::Batch(_) => "batch",
            Self::Unknown => "unknown",
        }
    }
}

/// Classify a raw inbound payload.
///
/// Invalid JSON, or a recognized envelope with malformed fields, is a
/// [`ProtocolError`]. Valid JSON of any other shape is [`Inbound::Unknown`].
pub fn classify(payload: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(map) = value else {
        return Ok(Inbound::Unknown);
    };

    if map.get("status").and_then(Value::as_str) == Some("accepted") {
        let task_id = map
            .get("task_id")
            .cloned()
            .map(serde_json::from_value::<Option<TaskId>>)
            .transpose()
            .map_err(|e| ProtocolError::shape("accepted", &e))?
            .flatten();
        return Ok(Inbound::Accepted { task_id });
    }

    if map.contains_key("answer") {
        return decode(map, "answer").map(Inbound::Answer);
    }

    if map.get("messages").is_some_and(Value::is_array) {
        return decode(map, "batch").map(Inbound::Batch);
    }

    Ok(Inbound::Unknown)
}

fn decode<T: for<'de> Deserialize<'de>>(
    map: Map<String, Value>,
    envelope: &'static str,
) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| ProtocolError::shape(envelope, &e))
}
