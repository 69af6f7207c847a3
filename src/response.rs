use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PERMANENT;

/// The kind of operation a [`Response`] describes.
///
/// The numeric codes are part of the wire contract consumed by external
/// watchers and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Action {
    Error = -1,
    Set = 0,
    Delete = 1,
    Get = 2,
}

impl From<Action> for i8 {
    fn from(action: Action) -> i8 {
        action as i8
    }
}

impl TryFrom<i8> for Action {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, String> {
        match code {
            -1 => Ok(Action::Error),
            0 => Ok(Action::Set),
            1 => Ok(Action::Delete),
            2 => Ok(Action::Get),
            other => Err(format!("unknown action code: {}", other)),
        }
    }
}

/// Immutable record of one store operation's outcome.
///
/// A `Response` is returned to the caller, passed to the registered
/// [`Watcher`](crate::Watcher) and, serialized as JSON, forwarded to the
/// messager sink. Field names in the serialized form are the wire contract:
///
/// ```json
/// { "action": 0, "key": "/a", "oldValue": "", "newValue": "1",
///   "exist": false, "expiration": "1970-01-01T00:00:00Z", "index": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub action: Action,
    pub key: String,
    /// Value before the operation; empty when the key did not exist.
    pub old_value: String,
    /// Value after the operation; empty for deletes and misses.
    pub new_value: String,
    /// Whether the key was present before the operation.
    pub exist: bool,
    /// Expiration instant after the operation; [`PERMANENT`] when the key
    /// never expires or is absent.
    pub expiration: DateTime<Utc>,
    /// Order index assigned by the caller; 0 for internally originated
    /// events (reads and expiry firings) that carry no external order.
    pub index: u64,
}

impl Response {
    pub fn set(
        key: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        exist: bool,
        expiration: DateTime<Utc>,
        index: u64,
    ) -> Self {
        Self {
            action: Action::Set,
            key: key.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            exist,
            expiration,
            index,
        }
    }

    pub fn delete(
        key: impl Into<String>,
        old_value: impl Into<String>,
        exist: bool,
        expiration: DateTime<Utc>,
        index: u64,
    ) -> Self {
        Self {
            action: Action::Delete,
            key: key.into(),
            old_value: old_value.into(),
            new_value: String::new(),
            exist,
            expiration,
            index,
        }
    }

    /// A `GET` hit; the original reports the stored value as both the old
    /// and new value.
    pub fn get_hit(key: impl Into<String>, value: &str, expiration: DateTime<Utc>) -> Self {
        Self {
            action: Action::Get,
            key: key.into(),
            old_value: value.to_string(),
            new_value: value.to_string(),
            exist: true,
            expiration,
            index: 0,
        }
    }

    /// A `GET` miss: empty values, sentinel expiration.
    pub fn get_miss(key: impl Into<String>) -> Self {
        Self {
            action: Action::Get,
            key: key.into(),
            old_value: String::new(),
            new_value: String::new(),
            exist: false,
            expiration: PERMANENT,
            index: 0,
        }
    }
}
