//! Comments and reply threading.
//!
//! The API returns a post's comments as a flat list where replies point at
//! their parent through `parent_id`. [`CommentTree::build`] nests them for
//! display.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::user::UserSummary;

/// A comment or reply on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment ID
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Parent comment for replies; `None` for top-level comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Author
    pub author: UserSummary,
    /// Markdown body
    pub content: String,
    /// Number of likes
    #[serde(default)]
    pub like_count: u64,
    /// Creation time in RFC3339 format
    pub created_at: String,
    /// Nested replies; filled by [`CommentTree::build`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Number of replies below this comment at any depth.
    pub fn descendant_count(&self) -> usize {
        self.replies.iter().map(|r| 1 + r.descendant_count()).sum()
    }
}

/// Request body for `POST /posts/{id}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Target post
    pub post_id: i64,
    /// Parent comment when replying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Markdown body
    pub content: String,
}

/// Threaded view of a post's comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentTree {
    /// Top-level comments in server order, replies nested inside
    pub roots: Vec<Comment>,
}

impl CommentTree {
    /// Nest a flat comment list.
    ///
    /// Siblings keep their relative order from `flat`. A reply whose parent is
    /// missing from the list (deleted, or on another page) is promoted to the
    /// top level rather than dropped.
    pub fn build(flat: Vec<Comment>) -> Self {
        let known: std::collections::HashSet<i64> = flat.iter().map(|c| c.id).collect();

        let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
        let mut roots = Vec::new();
        for mut comment in flat {
            comment.replies.clear();
            match comment.parent_id {
                Some(parent) if parent != comment.id && known.contains(&parent) => {
                    children.entry(parent).or_default().push(comment);
                },
                _ => roots.push(comment),
            }
        }

        for root in &mut roots {
            attach_replies(root, &mut children);
        }

        // Anything left belongs to a parent cycle; surface it instead of losing it.
        let mut leftovers: Vec<Comment> = children.into_values().flatten().collect();
        leftovers.sort_by_key(|c| c.id);
        roots.extend(leftovers);

        Self { roots }
    }

    /// Total number of comments, replies included.
    pub fn len(&self) -> usize {
        self.roots.iter().map(|c| 1 + c.descendant_count()).sum()
    }

    /// Whether there are no comments.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Find a comment anywhere in the tree.
    pub fn find(&self, id: i64) -> Option<&Comment> {
        fn walk(nodes: &[Comment], id: i64) -> Option<&Comment> {
            nodes.iter().find_map(|c| if c.id == id { Some(c) } else { walk(&c.replies, id) })
        }
        walk(&self.roots, id)
    }
}

fn attach_replies(node: &mut Comment, children: &mut HashMap<i64, Vec<Comment>>) {
    if let Some(mut replies) = children.remove(&node.id) {
        for reply in &mut replies {
            attach_replies(reply, children);
        }
        node.replies = replies;
    }
}
