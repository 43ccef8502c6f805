//! Comment snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, TaskId};

/// A comment together with its replies.
///
/// This is a snapshot: the comment store builds a fresh value for every
/// query, so holding one never observes later mutations.
///
/// Traversal and drop are iterative, so arbitrarily deep reply chains are
/// safe to read and discard. The derived `Clone`, `PartialEq`, `Debug` and
/// serde impls still recurse once per nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Number of nodes in this subtree, this comment included.
    pub fn subtree_size(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order traversal of this subtree.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }
}

impl Drop for Comment {
    fn drop(&mut self) {
        // flatten first so no reply is dropped while still holding children
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut reply) = stack.pop() {
            stack.append(&mut reply.replies);
        }
    }
}

/// Pre-order iterator over a comment subtree.
pub struct Preorder<'a> {
    stack: Vec<&'a Comment>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Comment;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // reversed so the first reply is visited first
        self.stack.extend(node.replies.iter().rev());
        Some(node)
    }
}
