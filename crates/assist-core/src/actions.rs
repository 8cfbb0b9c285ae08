//! Quick-reply affordances and the conversational mode.
//!
//! The backend offers either a list of button commands or a list of
//! selectable roles. Both are transient: a new set replaces the old one
//! wholesale.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse conversational state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Free conversation.
    #[default]
    Chat,
    /// Trainer / role-play state, entered when roles or the escalation command appear.
    Skynet,
}

impl Mode {
    /// Parse an explicit `mode` value from the backend.
    ///
    /// Only `"chat"` and `"skynet"` are recognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(Self::Chat),
            "skynet" => Some(Self::Skynet),
            _ => None,
        }
    }

    /// Infer the mode from the available actions.
    ///
    /// `Skynet` when any role is offered or the buttons contain the
    /// escalation command, `Chat` otherwise.
    pub fn infer(buttons: &[String], roles: &[Role], escalation_command: &str) -> Self {
        if !roles.is_empty() || buttons.iter().any(|b| b == escalation_command) {
            Self::Skynet
        } else {
            Self::Chat
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Skynet => "skynet",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// A selectable role.
///
/// The backend uses either `id`/`name` or `role_id`/`role_name`, and ids may
/// arrive as numbers or numeric strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRole")]
pub struct Role {
    /// Role identifier sent back as `role_id`.
    pub id: i64,
    /// Display name, also sent as the prompt.
    pub name: String,
}

impl Role {
    /// Create a role.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawRole {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    role_id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role_name: Option<String>,
}

impl TryFrom<RawRole> for Role {
    type Error = String;

    fn try_from(raw: RawRole) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .as_ref()
            .and_then(integer_id)
            .or_else(|| raw.role_id.as_ref().and_then(integer_id))
            .ok_or_else(|| "role is missing a numeric id or role_id".to_string())?;
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .or(raw.role_name)
            .ok_or_else(|| "role is missing name or role_name".to_string())?;
        Ok(Self { id, name })
    }
}

fn integer_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action
// ─────────────────────────────────────────────────────────────────────────────

/// Kind tag of an [`Action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Local mode command.
    Mode,
    /// Backend-supplied button.
    Button,
    /// Selectable role.
    Role,
}

/// A quick-reply affordance offered to the user.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// A mode command, sent as text when activated.
    Mode(String),
    /// A backend button, sent as text when activated.
    Button(String),
    /// A role, sent as a role selection when activated.
    Role(Role),
}

impl Action {
    /// Display label.
    pub fn label(&self) -> &str {
        match self {
            Self::Mode(command) | Self::Button(command) => command,
            Self::Role(role) => &role.name,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Mode(_) => ActionKind::Mode,
            Self::Button(_) => ActionKind::Button,
            Self::Role(_) => ActionKind::Role,
        }
    }
}
