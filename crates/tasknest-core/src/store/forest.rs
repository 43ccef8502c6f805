//! Comment forest stored as an arena.
//!
//! Design:
//! - `nodes`: CommentId -> node, each node knows its parent and its ordered
//!   child ids
//! - `roots`: root ids in insertion order, across all tasks
//! - Invariant: a node's id is listed exactly once, either in `roots` (no
//!   parent) or in its parent's `children`
//! - Invariant: every node carries the task id of its root
//!
//! Nodes are only ever attached as new leaves, so cycles cannot form.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use crate::domain::{Comment, CommentId, TaskId};

#[derive(Debug, Clone)]
struct Node {
    task_id: TaskId,
    author: String,
    content: String,
    created_at: DateTime<Utc>,
    parent: Option<CommentId>,
    children: Vec<CommentId>,
}

/// Data for a node about to be inserted.
#[derive(Debug, Clone)]
pub(crate) struct NewComment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct CommentForest {
    nodes: HashMap<CommentId, Node>,
    roots: Vec<CommentId>,
}

impl CommentForest {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn task_of(&self, id: &CommentId) -> Option<&TaskId> {
        self.nodes.get(id).map(|n| &n.task_id)
    }

    /// Append a new root. The id must not be present yet.
    pub fn insert_root(&mut self, new: NewComment) -> bool {
        let Entry::Vacant(slot) = self.nodes.entry(new.id.clone()) else {
            return false;
        };
        slot.insert(Node {
            task_id: new.task_id,
            author: new.author,
            content: new.content,
            created_at: new.created_at,
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(new.id);
        true
    }

    /// Append a new reply under `parent`. The reply takes the parent's task id.
    ///
    /// Returns false (and inserts nothing) if the parent does not exist or the
    /// id is already present.
    pub fn insert_reply(&mut self, parent: &CommentId, new: NewComment) -> bool {
        if self.nodes.contains_key(&new.id) {
            return false;
        }
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return false;
        };
        parent_node.children.push(new.id.clone());
        let task_id = parent_node.task_id.clone();
        self.nodes.insert(
            new.id,
            Node {
                task_id,
                author: new.author,
                content: new.content,
                created_at: new.created_at,
                parent: Some(parent.clone()),
                children: Vec::new(),
            },
        );
        true
    }

    /// Remove `id` and its whole subtree.
    ///
    /// Returns the task id and the number of removed nodes, or `None` when the
    /// id is unknown. Cost is the subtree size plus the sibling list scan.
    pub fn remove_subtree(&mut self, id: &CommentId) -> Option<(TaskId, usize)> {
        let node = self.nodes.remove(id)?;
        match &node.parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = 1;
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(child_node) = self.nodes.remove(&child) {
                removed += 1;
                stack.extend(child_node.children);
            }
        }
        Some((node.task_id, removed))
    }

    /// Replace a node's content. Returns its task id, or `None` if unknown.
    pub fn update_content(&mut self, id: &CommentId, content: String) -> Option<TaskId> {
        let node = self.nodes.get_mut(id)?;
        node.content = content;
        Some(node.task_id.clone())
    }

    pub fn content_of(&self, id: &CommentId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.content.as_str())
    }

    /// Nesting level of a node: roots are at depth 0.
    pub fn depth(&self, id: &CommentId) -> Option<usize> {
        let mut node = self.nodes.get(id)?;
        let mut depth = 0;
        while let Some(parent) = &node.parent {
            node = self.nodes.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Owned snapshot of the subtree rooted at `id`.
    ///
    /// Built without recursion: nodes are listed in pre-order, then each one
    /// is attached to its parent walking that list backwards, by which point
    /// all of its own replies are in place.
    pub fn snapshot(&self, id: &CommentId) -> Option<Comment> {
        let root = self.nodes.get(id)?;

        // (comment, index of parent in `built`)
        let mut built: Vec<(Option<Comment>, Option<usize>)> = Vec::new();
        let mut stack: Vec<(&CommentId, &Node, Option<usize>)> = vec![(id, root, None)];
        while let Some((id, node, parent)) = stack.pop() {
            let index = built.len();
            built.push((Some(self.flat(id, node)), parent));
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .filter_map(|child| self.nodes.get(child).map(|n| (child, n, Some(index)))),
            );
        }

        for index in (1..built.len()).rev() {
            let (slot, parent) = &mut built[index];
            let parent = *parent;
            let Some(mut comment) = slot.take() else {
                continue;
            };
            // children were pushed last-first
            comment.replies.reverse();
            if let Some((Some(parent_comment), _)) = parent.and_then(|p| built.get_mut(p)) {
                parent_comment.replies.push(comment);
            }
        }

        let (root, _) = built.into_iter().next()?;
        root.map(|mut comment| {
            comment.replies.reverse();
            comment
        })
    }

    fn flat(&self, id: &CommentId, node: &Node) -> Comment {
        Comment {
            id: id.clone(),
            task_id: node.task_id.clone(),
            author: node.author.clone(),
            content: node.content.clone(),
            created_at: node.created_at,
            parent_id: node.parent.clone(),
            replies: Vec::new(),
        }
    }

    fn roots_of<'a>(&'a self, task_id: &'a TaskId) -> impl Iterator<Item = &'a CommentId> + 'a {
        self.roots
            .iter()
            .filter(move |id| self.nodes.get(*id).is_some_and(|n| &n.task_id == task_id))
    }

    /// Root comments of a task with their replies, in insertion order.
    pub fn roots_for_task(&self, task_id: &TaskId) -> Vec<Comment> {
        self.roots_of(task_id)
            .filter_map(|id| self.snapshot(id))
            .collect()
    }

    /// Number of nodes in the subtree rooted at `id` (0 if unknown).
    pub fn subtree_size(&self, id: &CommentId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                count += 1;
                stack.extend(node.children.iter());
            }
        }
        count
    }

    /// Total nodes in every tree rooted at `task_id`.
    pub fn count_for_task(&self, task_id: &TaskId) -> usize {
        self.roots_of(task_id).map(|id| self.subtree_size(id)).sum()
    }

    /// Every node exactly once, in pre-order, roots in insertion order.
    ///
    /// Entries are flat: `replies` is left empty, `parent_id` links them.
    pub fn preorder(&self) -> Vec<Comment> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&CommentId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(self.flat(id, node));
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Remove every tree of `task_id`. Returns the number of removed nodes.
    pub fn clear_task(&mut self, task_id: &TaskId) -> usize {
        let doomed: Vec<CommentId> = self.roots_of(task_id).cloned().collect();
        doomed
            .iter()
            .filter_map(|id| self.remove_subtree(id))
            .map(|(_, removed)| removed)
            .sum()
    }

    /// Build a forest from nested snapshots.
    ///
    /// Structure wins over the snapshot fields: `parent_id` is taken from the
    /// nesting and every reply gets its root's task id. Nodes whose id was
    /// already seen are skipped together with their subtree; the number of
    /// skipped nodes is returned alongside the forest.
    pub fn from_snapshots(roots: Vec<Comment>) -> (Self, usize) {
        let mut forest = Self::default();
        let mut skipped = 0;
        // (comment, parent) pairs still to attach
        let mut stack: Vec<(Comment, Option<CommentId>)> =
            roots.into_iter().rev().map(|c| (c, None)).collect();

        while let Some((mut comment, parent)) = stack.pop() {
            let replies = std::mem::take(&mut comment.replies);
            let new = NewComment {
                id: comment.id.clone(),
                task_id: comment.task_id.clone(),
                author: std::mem::take(&mut comment.author),
                content: std::mem::take(&mut comment.content),
                created_at: comment.created_at,
            };
            let inserted = match &parent {
                None => forest.insert_root(new),
                Some(parent) => forest.insert_reply(parent, new),
            };
            if !inserted {
                skipped += replies.iter().map(Comment::subtree_size).sum::<usize>() + 1;
                continue;
            }
            stack.extend(
                replies
                    .into_iter()
                    .rev()
                    .map(|reply| (reply, Some(comment.id.clone()))),
            );
        }
        (forest, skipped)
    }
}
