use serde::{Deserialize, Serialize};

/// Snapshot of a toggleable reaction (like, bookmark, follow) as seen by the
/// signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionState {
    /// Whether the signed-in user has the reaction set
    pub active: bool,
    /// Total count across all users
    pub count: u64,
}

impl ReactionState {
    /// Build a snapshot.
    pub fn new(active: bool, count: u64) -> Self {
        Self { active, count }
    }

    /// The state the server is expected to reach after a toggle.
    pub fn toggled(self) -> Self {
        if self.active {
            Self {
                active: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                active: true,
                count: self.count + 1,
            }
        }
    }
}
