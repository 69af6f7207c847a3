use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;

use crate::PERMANENT;

/// The stored record for one key: its value, its expiration instant and,
/// while the key is volatile, the control handle of its live expiration
/// task.
///
/// Nodes are replaced, not mutated, on every set; the control handle is
/// runtime state and never serialized.
#[derive(Debug, Clone)]
pub struct Node {
    value: String,
    expire_at: DateTime<Utc>,
    control: Option<UnboundedSender<DateTime<Utc>>>,
}

impl Node {
    pub(crate) fn new(
        value: String,
        expire_at: DateTime<Utc>,
        control: Option<UnboundedSender<DateTime<Utc>>>,
    ) -> Self {
        Self {
            value,
            expire_at,
            control,
        }
    }

    /// Returns the stored value as a string slice.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the expiration instant; [`PERMANENT`] for keys that never
    /// expire.
    pub fn expire_at(&self) -> DateTime<Utc> {
        self.expire_at
    }

    /// Whether this node carries the "never expires" sentinel.
    pub fn is_permanent(&self) -> bool {
        self.expire_at == PERMANENT
    }

    pub(crate) fn control(&self) -> Option<&UnboundedSender<DateTime<Utc>>> {
        self.control.as_ref()
    }

    pub(crate) fn into_value(self) -> String {
        self.value
    }
}
