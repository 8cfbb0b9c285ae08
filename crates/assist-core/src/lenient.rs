//! Tolerant field decoders for backend payloads.
//!
//! Only the fields that decide what an envelope means (`answer`, `task_id`,
//! `messages`, a message `id`) are decoded strictly. Everything else degrades:
//! a value that does not fit is dropped with a warning, and list items that
//! do not decode are skipped, so the rest of the frame still applies.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// `Option<T>`: null, or a value that does not decode, is `None`.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!(error = %e, "ignoring undecodable field");
            Ok(None)
        }
    }
}

/// List with undecodable items skipped. Null or a non-list is empty.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(items(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Like [`list`], but null or a non-list stays `None` so "absent" and
/// "explicitly empty" remain distinct.
pub(crate) fn optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(items(Value::deserialize(deserializer)?))
}

fn items<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    let raw = match value {
        Value::Array(raw) => raw,
        Value::Null => return None,
        other => {
            warn!(value = %other, "expected a list, ignoring field");
            return None;
        }
    };
    let decoded = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(index, error = %e, "skipping undecodable list item");
                None
            }
        })
        .collect();
    Some(decoded)
}

/// Text: null is empty, other scalars keep their JSON spelling.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
/// Anything else is `None`.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::String(raw) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(parse_timestamp(&raw))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => {
            warn!(value = raw, "ignoring unparseable timestamp");
            None
        }
    }
}
