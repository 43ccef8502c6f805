//! Change events emitted by the stores.
//!
//! Every committed mutation produces exactly one event. Mutations that change
//! nothing (unknown id, same flag value) produce none.

use super::{CommentId, TaskId};

/// Envelope for a store change.
///
/// `version` is the store's version after the mutation; it increases by one
/// per committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent<C> {
    pub version: u64,
    pub change: C,
}

impl<C> StoreEvent<C> {
    pub fn new(version: u64, change: C) -> Self {
        Self { version, change }
    }
}

/// What changed in the task store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskChange {
    Replaced { count: usize },
    Added(TaskId),
    Updated(TaskId),
    Deleted(TaskId),
    Cleared,
    Selected(Option<TaskId>),
    Loading(bool),
    Error(Option<String>),
}

impl TaskChange {
    /// Whether the task collection itself changed (as opposed to flags or
    /// selection only).
    pub fn touches_tasks(&self) -> bool {
        matches!(
            self,
            TaskChange::Replaced { .. }
                | TaskChange::Added(_)
                | TaskChange::Updated(_)
                | TaskChange::Deleted(_)
                | TaskChange::Cleared
        )
    }
}

/// What changed in the comment store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentChange {
    Replaced {
        count: usize,
    },
    Added {
        id: CommentId,
        task_id: TaskId,
        parent_id: Option<CommentId>,
    },
    Updated {
        id: CommentId,
        task_id: TaskId,
    },
    /// A node and its whole subtree were removed; `removed` is the node count.
    Deleted {
        id: CommentId,
        task_id: TaskId,
        removed: usize,
    },
    ClearedForTask {
        task_id: TaskId,
        removed: usize,
    },
    Loading(bool),
    Error(Option<String>),
}

impl CommentChange {
    /// Task whose thread was affected, when the change is scoped to one.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            CommentChange::Added { task_id, .. }
            | CommentChange::Updated { task_id, .. }
            | CommentChange::Deleted { task_id, .. }
            | CommentChange::ClearedForTask { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

pub type TaskEvent = StoreEvent<TaskChange>;
pub type CommentEvent = StoreEvent<CommentChange>;
