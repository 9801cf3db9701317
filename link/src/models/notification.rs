use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone liked one of your posts or comments.
    Like,
    /// Someone commented on one of your posts.
    Comment,
    /// Someone replied to one of your comments.
    Reply,
    /// Someone started following you.
    Follow,
    /// Someone mentioned you.
    Mention,
    /// Announcement from moderators or the system.
    #[default]
    System,
    /// A kind this client version does not know about.
    #[serde(other)]
    Unknown,
}

/// A notification delivered to the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification ID
    pub id: i64,

    /// Trigger category
    #[serde(default)]
    pub kind: NotificationKind,

    /// Display text, already rendered server-side
    #[serde(default)]
    pub message: String,

    /// User who caused the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserSummary>,

    /// Related post, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,

    /// Slug of the related post, for building links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_slug: Option<String>,

    /// Related comment, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,

    /// Whether the user has seen it
    #[serde(default)]
    pub read: bool,

    /// Creation time in RFC3339 format
    #[serde(default)]
    pub created_at: String,
}

/// Response body of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    /// Number of unread notifications
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_notification_uses_defaults() {
        let n: Notification = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(n.id, 3);
        assert_eq!(n.kind, NotificationKind::System);
        assert!(!n.read);
        assert!(n.actor.is_none());
    }

    #[test]
    fn test_unknown_kind_is_tolerated() {
        let n: Notification = serde_json::from_str(r#"{"id": 1, "kind": "badge_awarded"}"#).unwrap();
        assert_eq!(n.kind, NotificationKind::Unknown);
    }

    #[test]
    fn test_camel_case_fields() {
        let n: Notification = serde_json::from_str(
            r#"{"id": 9, "kind": "reply", "postId": 4, "postSlug": "hello", "commentId": 11, "createdAt": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(n.post_id, Some(4));
        assert_eq!(n.post_slug.as_deref(), Some("hello"));
        assert_eq!(n.comment_id, Some(11));
        assert_eq!(n.created_at, "2024-05-01T10:00:00Z");
    }
}
