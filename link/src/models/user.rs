use serde::{Deserialize, Serialize};

/// Compact author/actor reference embedded in posts, comments and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User ID
    pub id: i64,
    /// Unique handle
    pub username: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// Display name when set, otherwise the username.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity fields
    #[serde(flatten)]
    pub user: UserSummary,
    /// Profile bio
    #[serde(default)]
    pub bio: Option<String>,
    /// Number of followers
    #[serde(default)]
    pub follower_count: u64,
    /// Number of users this user follows
    #[serde(default)]
    pub following_count: u64,
    /// Whether the signed-in user follows this user
    #[serde(default)]
    pub followed_by_me: bool,
}
