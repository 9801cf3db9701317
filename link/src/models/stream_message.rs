use serde::{Deserialize, Serialize};

use super::notification::Notification;

/// A message pushed over the notification stream.
///
/// Encoded as `{"kind": "item", "data": {...}}` or
/// `{"kind": "count", "data": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum StreamMessage<T = Notification> {
    /// A newly created record. Always newer than anything already held, so
    /// receivers prepend it.
    Item(T),

    /// Replacement value for a tracked counter (unread notifications).
    Count(u64),
}

impl<T> StreamMessage<T> {
    /// The carried record, if this is an item message.
    pub fn item(&self) -> Option<&T> {
        match self {
            StreamMessage::Item(item) => Some(item),
            StreamMessage::Count(_) => None,
        }
    }

    /// The carried counter, if this is a count message.
    pub fn count(&self) -> Option<u64> {
        match self {
            StreamMessage::Count(count) => Some(*count),
            StreamMessage::Item(_) => None,
        }
    }
}
