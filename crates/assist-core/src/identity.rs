//! Identity collaborator.
//!
//! The host supplies who the user is; the client only reads it. Fresh
//! Telegram launch data wins and is persisted through an
//! [`IdentityProvider`], so a reload without launch data can fall back to
//! the stored copy.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::IdentityError;

/// Placeholder substituted by the user id in endpoint templates.
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

/// The Telegram user behind the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    /// Numeric user id; selects the per-user endpoint.
    pub id: i64,
    /// Given name, used as the display name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Public handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Parsed launch data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The user, when the launch data carried one.
    #[serde(default)]
    pub user: Option<TelegramUser>,
    /// Unix time the launch data was signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_date: Option<i64>,
    /// Launch data signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Identity {
    /// Parse a raw url-encoded launch string (`user=%7B...%7D&auth_date=..&hash=..`).
    pub fn from_init_data(raw: &str) -> Result<Self, IdentityError> {
        let raw = raw.trim().trim_start_matches(['?', '#']);
        let mut identity = Self::default();
        let mut saw_user = false;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "user" => {
                    let user: TelegramUser = serde_json::from_str(&value)
                        .map_err(|e| IdentityError::InvalidInitData(format!("user: {e}")))?;
                    identity.user = Some(user);
                    saw_user = true;
                }
                "auth_date" => identity.auth_date = value.parse().ok(),
                "hash" => identity.hash = Some(value.into_owned()),
                _ => {}
            }
        }

        if !saw_user {
            return Err(IdentityError::InvalidInitData("missing user".into()));
        }
        Ok(identity)
    }

    /// The user id, if it is usable for connection establishment.
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id).filter(|id| *id > 0)
    }

    /// First name, or `fallback` when unknown.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.user
            .as_ref()
            .map(|u| u.first_name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback)
    }

    /// The per-user endpoint built from `template`, or `None` without a usable id.
    pub fn endpoint(&self, template: &str) -> Option<String> {
        let id = self.user_id()?;
        Some(template.replace(USER_ID_PLACEHOLDER, &id.to_string()))
    }
}

/// Where the identity is cached between launches.
pub trait IdentityProvider: Send + Sync {
    /// The stored identity, if any.
    fn load(&self) -> Option<Identity>;

    /// Replace the stored identity.
    fn save(&self, identity: &Identity) -> Result<(), IdentityError>;
}

/// Resolve the identity for this launch.
///
/// Fresh launch data is parsed and persisted; otherwise the stored identity
/// is used. With neither, the launch has no identity.
pub fn bootstrap_identity(
    fresh: Option<&str>,
    store: &dyn IdentityProvider,
) -> Result<Identity, IdentityError> {
    if let Some(raw) = fresh.filter(|r| !r.trim().is_empty()) {
        let identity = Identity::from_init_data(raw)?;
        if let Err(e) = store.save(&identity) {
            warn!(error = %e, "failed to persist identity");
        }
        return Ok(identity);
    }

    match store.load() {
        Some(identity) => {
            debug!("using stored identity");
            Ok(identity)
        }
        None => Err(IdentityError::NoInitData),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stores
// ─────────────────────────────────────────────────────────────────────────────

/// JSON file store.
#[derive(Clone, Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location (`~/.assist/identity.json`).
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".assist").join("identity.json")
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Identity, IdentityError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl IdentityProvider for FileIdentityStore {
    fn load(&self) -> Option<Identity> {
        if !self.path.exists() {
            return None;
        }
        match self.read() {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "ignoring unreadable identity store");
                None
            }
        }
    }

    fn save(&self, identity: &Identity) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(identity)?)?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identity: Mutex<Option<Identity>>,
}

impl MemoryIdentityStore {
    /// Store pre-populated with `identity`.
    pub fn with(identity: Identity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
        }
    }
}

impl IdentityProvider for MemoryIdentityStore {
    fn load(&self) -> Option<Identity> {
        self.identity.lock().clone()
    }

    fn save(&self, identity: &Identity) -> Result<(), IdentityError> {
        *self.identity.lock() = Some(identity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const TEMPLATE: &str = "wss://host/ws/notifications/{user_id}/";
    const RAW: &str = "query_id=AAE&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ivan%22%2C%22language_code%22%3A%22ru%22%7D&auth_date=1700000000&hash=abc123";

    fn identity(id: i64, name: &str) -> Identity {
        Identity {
            user: Some(TelegramUser {
                id,
                first_name: name.into(),
                last_name: None,
                username: None,
                language_code: None,
            }),
            auth_date: None,
            hash: None,
        }
    }

    // -- parsing --

    #[test]
    fn parse_init_data() {
        let parsed = Identity::from_init_data(RAW).unwrap();
        let user = parsed.user.as_ref().unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.first_name, "Ivan");
        assert_eq!(user.language_code.as_deref(), Some("ru"));
        assert_eq!(parsed.auth_date, Some(1_700_000_000));
        assert_eq!(parsed.hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn parse_tolerates_leading_question_mark() {
        let raw = format!("?{RAW}");
        assert_eq!(Identity::from_init_data(&raw).unwrap().user_id(), Some(42));
    }

    #[test]
    fn parse_without_user_fails() {
        assert_matches!(
            Identity::from_init_data("auth_date=1&hash=x"),
            Err(IdentityError::InvalidInitData(_))
        );
    }

    #[test]
    fn parse_with_bad_user_json_fails() {
        assert_matches!(
            Identity::from_init_data("user=%7Bnope"),
            Err(IdentityError::InvalidInitData(_))
        );
    }

    // -- derived values --

    #[test]
    fn endpoint_from_template() {
        assert_eq!(
            identity(42, "A").endpoint(TEMPLATE).as_deref(),
            Some("wss://host/ws/notifications/42/")
        );
    }

    #[test]
    fn no_usable_id_means_no_endpoint() {
        assert!(Identity::default().endpoint(TEMPLATE).is_none());
        assert!(identity(0, "A").endpoint(TEMPLATE).is_none());
        assert!(identity(-5, "A").endpoint(TEMPLATE).is_none());
    }

    #[test]
    fn display_name_falls_back() {
        assert_eq!(identity(1, "Ivan").display_name("Пользователь"), "Ivan");
        assert_eq!(identity(1, "").display_name("Пользователь"), "Пользователь");
        assert_eq!(Identity::default().display_name("Пользователь"), "Пользователь");
    }

    // -- bootstrap --

    #[test]
    fn fresh_init_data_is_persisted() {
        let store = MemoryIdentityStore::default();
        let resolved = bootstrap_identity(Some(RAW), &store).unwrap();
        assert_eq!(resolved.user_id(), Some(42));
        assert_eq!(store.load(), Some(resolved));
    }

    #[test]
    fn stored_identity_used_without_fresh_data() {
        let store = MemoryIdentityStore::with(identity(7, "Stored"));
        let resolved = bootstrap_identity(None, &store).unwrap();
        assert_eq!(resolved.user_id(), Some(7));
    }

    #[test]
    fn blank_fresh_data_falls_back_to_store() {
        let store = MemoryIdentityStore::with(identity(7, "Stored"));
        assert_eq!(bootstrap_identity(Some("  "), &store).unwrap().user_id(), Some(7));
    }

    #[test]
    fn nothing_available() {
        let store = MemoryIdentityStore::default();
        assert_matches!(bootstrap_identity(None, &store), Err(IdentityError::NoInitData));
    }

    // -- file store --

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("nested").join("identity.json"));
        assert!(store.load().is_none());
        store.save(&identity(9, "File")).unwrap();
        assert_eq!(store.load().unwrap().user_id(), Some(9));
    }

    #[test]
    fn file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "{corrupt").unwrap();
        assert!(FileIdentityStore::new(path).load().is_none());
    }
}
