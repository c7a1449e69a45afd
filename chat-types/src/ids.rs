//! Identity types for routerchat messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned message identifier.
///
/// The backend hands these out (currently a millisecond clock reading), so
/// clients treat them as opaque and only rely on uniqueness.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Create a MessageId with the given value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this MessageId.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}
