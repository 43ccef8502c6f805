//! Comment store: nested discussion threads for every task.
//!
//! # Usage
//! ```ignore
//! let root = comments.add_comment(&task_id, "Hello", "Alice", None)?;
//! comments.add_comment(&task_id, "Reply", "Bob", Some(&root.id))?;
//! assert_eq!(comments.get_comment_count_for_task(&task_id), 2);
//! ```

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::forest::{CommentForest, NewComment};
use crate::domain::{Comment, CommentChange, CommentError, CommentEvent, CommentId, TaskId};
use crate::observe::{Notifier, Observable};
use crate::ports::{Clock, IdGenerator};
use crate::sync::{read, write};

#[derive(Debug, Default)]
struct CommentState {
    forest: CommentForest,
    is_loading: bool,
    error: Option<String>,
    version: u64,
}

/// Owner of the comment forest.
///
/// Content validation (empty text, minimum length, reply depth) is the
/// caller's job, see `crate::validate`. The store only trims content.
///
/// Queries return snapshots; nothing outside the store can reach a node.
#[derive(Clone)]
pub struct CommentStore {
    state: Arc<RwLock<CommentState>>,
    notifier: Notifier<CommentEvent>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl CommentStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CommentState::default())),
            notifier: Notifier::new(),
            clock,
            ids,
        }
    }

    fn commit<R>(&self, op: impl FnOnce(&mut CommentState) -> (R, Option<CommentChange>)) -> R {
        let (result, event) = {
            let mut state = write(&self.state);
            let (result, change) = op(&mut state);
            let event = change.map(|change| {
                state.version += 1;
                CommentEvent::new(state.version, change)
            });
            (result, event)
        };

        if let Some(event) = event {
            debug!(version = event.version, change = ?event.change, "comment store changed");
            self.notifier.emit(&event);
        }
        result
    }

    // ========================================
    // Mutations
    // ========================================

    /// Replace the whole forest from nested snapshots.
    pub fn set_comments(&self, roots: Vec<Comment>) {
        let (forest, skipped) = CommentForest::from_snapshots(roots);
        if skipped > 0 {
            warn!(skipped, "duplicate comment ids in replacement forest; dropped");
        }
        self.commit(|state| {
            state.forest = forest;
            let count = state.forest.len();
            ((), Some(CommentChange::Replaced { count }))
        })
    }

    /// Add a comment to `task_id`'s thread, as a root or as a reply.
    ///
    /// A reply is attached to `parent_id` wherever it sits in the forest and
    /// belongs to that parent's task. If the parent does not exist nothing is
    /// stored and `CommentError::ParentNotFound` is returned.
    pub fn add_comment(
        &self,
        task_id: &TaskId,
        content: &str,
        author: &str,
        parent_id: Option<&CommentId>,
    ) -> Result<Comment, CommentError> {
        let now = self.clock.now();
        let content = content.trim().to_string();

        self.commit(|state| {
            let owner = match parent_id {
                None => task_id.clone(),
                Some(parent) => match state.forest.task_of(parent) {
                    Some(parent_task) => {
                        if parent_task != task_id {
                            warn!(
                                %parent, %task_id, %parent_task,
                                "reply names a different task than its parent; using the parent's"
                            );
                        }
                        parent_task.clone()
                    }
                    None => {
                        warn!(%parent, "reply to unknown comment rejected");
                        return (Err(CommentError::ParentNotFound(parent.clone())), None);
                    }
                },
            };

            let mut id = self.ids.generate_comment_id();
            while state.forest.contains(&id) {
                id = self.ids.generate_comment_id();
            }
            let comment = Comment {
                id: id.clone(),
                task_id: owner.clone(),
                author: author.to_string(),
                content: content.clone(),
                created_at: now,
                parent_id: parent_id.cloned(),
                replies: Vec::new(),
            };
            let new = NewComment {
                id: id.clone(),
                task_id: owner.clone(),
                author: comment.author.clone(),
                content,
                created_at: now,
            };
            let stored = match parent_id {
                None => state.forest.insert_root(new),
                Some(parent) => state.forest.insert_reply(parent, new),
            };
            debug_assert!(stored, "comment {id} was not stored");
            if !stored {
                // the id is fresh, so only a missing parent can get here
                let parent = parent_id.cloned().unwrap_or_else(|| id.clone());
                return (Err(CommentError::ParentNotFound(parent)), None);
            }

            let change = CommentChange::Added {
                id,
                task_id: owner,
                parent_id: parent_id.cloned(),
            };
            (Ok(comment), Some(change))
        })
    }

    /// Delete a comment and every reply beneath it.
    ///
    /// Returns whether anything was removed.
    pub fn delete_comment(&self, id: &CommentId) -> bool {
        self.commit(|state| match state.forest.remove_subtree(id) {
            Some((task_id, removed)) => (
                true,
                Some(CommentChange::Deleted {
                    id: id.clone(),
                    task_id,
                    removed,
                }),
            ),
            None => (false, None),
        })
    }

    /// Replace a comment's content (trimmed). Returns false if unknown.
    pub fn update_comment(&self, id: &CommentId, content: &str) -> bool {
        let content = content.trim().to_string();
        self.commit(|state| {
            if state.forest.content_of(id) == Some(content.as_str()) {
                return (true, None);
            }
            match state.forest.update_content(id, content) {
                Some(task_id) => (
                    true,
                    Some(CommentChange::Updated {
                        id: id.clone(),
                        task_id,
                    }),
                ),
                None => (false, None),
            }
        })
    }

    /// Remove every thread of `task_id`. Returns the number of removed nodes.
    pub fn clear_comments_for_task(&self, task_id: &TaskId) -> usize {
        self.commit(|state| {
            let removed = state.forest.clear_task(task_id);
            if removed == 0 {
                return (0, None);
            }
            (
                removed,
                Some(CommentChange::ClearedForTask {
                    task_id: task_id.clone(),
                    removed,
                }),
            )
        })
    }

    pub fn set_loading(&self, loading: bool) {
        self.commit(|state| {
            if state.is_loading == loading {
                return ((), None);
            }
            state.is_loading = loading;
            ((), Some(CommentChange::Loading(loading)))
        })
    }

    pub fn set_error(&self, error: Option<String>) {
        self.commit(|state| {
            if state.error == error {
                return ((), None);
            }
            state.error = error.clone();
            ((), Some(CommentChange::Error(error)))
        })
    }

    // ========================================
    // Queries
    // ========================================

    /// Root comments of a task (with nested replies), in insertion order.
    pub fn get_comments_by_task_id(&self, task_id: &TaskId) -> Vec<Comment> {
        read(&self.state).forest.roots_for_task(task_id)
    }

    /// Total number of comments (roots and all replies) for a task.
    pub fn get_comment_count_for_task(&self, task_id: &TaskId) -> usize {
        read(&self.state).forest.count_for_task(task_id)
    }

    /// Every comment of every task in pre-order, flattened.
    pub fn all_comments(&self) -> Vec<Comment> {
        read(&self.state).forest.preorder()
    }

    /// Snapshot of one comment and its replies.
    pub fn get_comment(&self, id: &CommentId) -> Option<Comment> {
        read(&self.state).forest.snapshot(id)
    }

    /// Nesting level of a comment (roots are 0).
    pub fn depth_of(&self, id: &CommentId) -> Option<usize> {
        read(&self.state).forest.depth(id)
    }

    pub fn len(&self) -> usize {
        read(&self.state).forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state).is_loading
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    pub fn version(&self) -> u64 {
        read(&self.state).version
    }
}

impl Observable for CommentStore {
    type Event = CommentEvent;

    fn notifier(&self) -> &Notifier<CommentEvent> {
        &self.notifier
    }
}

impl std::fmt::Debug for CommentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = read(&self.state);
        f.debug_struct("CommentStore")
            .field("comments", &state.forest.len())
            .field("is_loading", &state.is_loading)
            .field("error", &state.error)
            .field("version", &state.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn store() -> CommentStore {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap(),
        ));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        CommentStore::new(clock, ids)
    }

    fn task() -> TaskId {
        TaskId::new("task-1")
    }

    #[test]
    fn root_comment_is_listed_for_its_task() {
        let store = store();

        store.add_comment(&task(), "Hello", "Alice", None).unwrap();

        let comments = store.get_comments_by_task_id(&task());
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].parent_id, None);
        assert_eq!(comments[0].content, "Hello");
        assert_eq!(comments[0].author, "Alice");
        assert!(comments[0].replies.is_empty());
        assert!(comments[0].id.has_generated_prefix());
    }

    #[test]
    fn reply_is_nested_under_its_parent() {
        let store = store();
        let root = store.add_comment(&task(), "Root", "Alice", None).unwrap();

        let reply = store
            .add_comment(&task(), "Reply", "Bob", Some(&root.id))
            .unwrap();

        let comments = store.get_comments_by_task_id(&task());
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].replies.len(), 1);
        assert_eq!(comments[0].replies[0].parent_id, Some(root.id.clone()));
        assert_eq!(comments[0].replies[0].id, reply.id);
        assert_eq!(store.depth_of(&reply.id), Some(1));
    }

    #[test]
    fn content_is_trimmed() {
        let store = store();
        let c = store.add_comment(&task(), "  spaced out \n", "A", None).unwrap();
        assert_eq!(c.content, "spaced out");

        assert!(store.update_comment(&c.id, "  edited  "));
        assert_eq!(store.get_comment(&c.id).unwrap().content, "edited");
    }

    #[test]
    fn orphan_reply_is_rejected_without_side_effects() {
        let store = store();
        store.add_comment(&task(), "Root", "Alice", None).unwrap();
        let version = store.version();

        let missing = CommentId::new("comment_missing");
        let err = store
            .add_comment(&task(), "Lost", "Bob", Some(&missing))
            .unwrap_err();

        assert_eq!(err, CommentError::ParentNotFound(missing));
        assert_eq!(store.len(), 1);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn count_covers_every_level_and_only_that_task() {
        let store = store();
        assert_eq!(store.get_comment_count_for_task(&task()), 0);

        let a = store.add_comment(&task(), "a", "x", None).unwrap();
        let b = store.add_comment(&task(), "b", "x", Some(&a.id)).unwrap();
        let c = store.add_comment(&task(), "c", "x", Some(&b.id)).unwrap();
        store.add_comment(&task(), "d", "x", Some(&c.id)).unwrap();
        store.add_comment(&task(), "e", "x", None).unwrap();
        store
            .add_comment(&TaskId::new("other"), "f", "x", None)
            .unwrap();

        assert_eq!(store.get_comment_count_for_task(&task()), 5);
        assert_eq!(store.get_comment_count_for_task(&TaskId::new("other")), 1);
        assert_eq!(store.all_comments().len(), 6);
    }

    #[test]
    fn delete_removes_the_whole_subtree_from_every_query() {
        let store = store();
        let root = store.add_comment(&task(), "root", "x", None).unwrap();
        let keep = store.add_comment(&task(), "keep", "x", None).unwrap();
        let r1 = store.add_comment(&task(), "r1", "x", Some(&root.id)).unwrap();
        let r2 = store.add_comment(&task(), "r2", "x", Some(&r1.id)).unwrap();

        assert!(store.delete_comment(&root.id));

        let roots = store.get_comments_by_task_id(&task());
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, keep.id);
        assert_eq!(store.get_comment_count_for_task(&task()), 1);
        let all: Vec<CommentId> = store.all_comments().iter().map(|c| c.id.clone()).collect();
        assert_eq!(all, vec![keep.id.clone()]);
        assert!(store.get_comment(&r1.id).is_none());
        assert!(store.get_comment(&r2.id).is_none());

        assert!(!store.delete_comment(&root.id));
    }

    #[test]
    fn deleting_a_nested_reply_keeps_its_ancestors() {
        let store = store();
        let root = store.add_comment(&task(), "root", "x", None).unwrap();
        let mid = store.add_comment(&task(), "mid", "x", Some(&root.id)).unwrap();
        let sibling = store.add_comment(&task(), "sib", "x", Some(&root.id)).unwrap();
        store.add_comment(&task(), "leaf", "x", Some(&mid.id)).unwrap();

        assert!(store.delete_comment(&mid.id));

        let roots = store.get_comments_by_task_id(&task());
        let replies: Vec<&CommentId> = roots[0].replies.iter().map(|c| &c.id).collect();
        assert_eq!(replies, vec![&sibling.id]);
        assert_eq!(store.get_comment_count_for_task(&task()), 2);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_writes() {
        let store = store();
        let root = store.add_comment(&task(), "root", "x", None).unwrap();
        let before = store.get_comments_by_task_id(&task());

        store.add_comment(&task(), "reply", "x", Some(&root.id)).unwrap();
        store.update_comment(&root.id, "changed");

        assert!(before[0].replies.is_empty());
        assert_eq!(before[0].content, "root");
        assert_eq!(
            store.get_comments_by_task_id(&task()),
            store.get_comments_by_task_id(&task())
        );
    }

    #[test]
    fn clear_for_task_removes_only_that_task() {
        let store = store();
        let a = store.add_comment(&task(), "a", "x", None).unwrap();
        store.add_comment(&task(), "b", "x", Some(&a.id)).unwrap();
        store
            .add_comment(&TaskId::new("other"), "c", "x", None)
            .unwrap();

        assert_eq!(store.clear_comments_for_task(&task()), 2);
        assert_eq!(store.clear_comments_for_task(&task()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn events_describe_each_mutation() {
        let store = store();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _sub = store.subscribe(move |e: &CommentEvent| sink.lock().unwrap().push(e.change.clone()));

        let root = store.add_comment(&task(), "root", "x", None).unwrap();
        let reply = store.add_comment(&task(), "r", "x", Some(&root.id)).unwrap();
        store.update_comment(&reply.id, "r");
        store.update_comment(&reply.id, "r2");
        store.delete_comment(&root.id);
        store.delete_comment(&root.id);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CommentChange::Added {
                    id: root.id.clone(),
                    task_id: task(),
                    parent_id: None,
                },
                CommentChange::Added {
                    id: reply.id.clone(),
                    task_id: task(),
                    parent_id: Some(root.id.clone()),
                },
                CommentChange::Updated {
                    id: reply.id.clone(),
                    task_id: task(),
                },
                CommentChange::Deleted {
                    id: root.id.clone(),
                    task_id: task(),
                    removed: 2,
                },
            ]
        );
    }

    #[test]
    fn comment_flags_emit_once_and_ignore_no_ops() {
        let store = store();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _sub = store.subscribe(move |e: &CommentEvent| sink.lock().unwrap().push(e.change.clone()));

        store.set_loading(false);
        store.set_loading(true);
        store.set_loading(true);
        store.set_error(Some("offline".into()));
        store.set_error(Some("offline".into()));
        store.set_error(None);
        store.set_error(None);

        assert!(store.is_loading());
        assert_eq!(store.error(), None);
        assert_eq!(store.version(), 3);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CommentChange::Loading(true),
                CommentChange::Error(Some("offline".into())),
                CommentChange::Error(None),
            ]
        );
    }

    #[test]
    fn deep_reply_chain_can_be_read_counted_and_deleted() {
        const DEPTH: usize = 20_000;
        let store = store();
        let root = store.add_comment(&task(), "root", "x", None).unwrap();
        let mut parent = root.id.clone();
        for i in 0..DEPTH {
            let reply = store
                .add_comment(&task(), &format!("reply {i}"), "x", Some(&parent))
                .unwrap();
            parent = reply.id.clone();
        }

        assert_eq!(store.get_comment_count_for_task(&task()), DEPTH + 1);
        assert_eq!(store.depth_of(&parent), Some(DEPTH));

        let roots = store.get_comments_by_task_id(&task());
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].iter().count(), DEPTH + 1);
        let deepest = roots[0].iter().last().unwrap();
        assert_eq!(deepest.id, parent);
        assert!(deepest.replies.is_empty());
        drop(roots);

        assert_eq!(store.get_comment(&root.id).unwrap().subtree_size(), DEPTH + 1);
        assert_eq!(store.all_comments().len(), DEPTH + 1);

        assert!(store.delete_comment(&root.id));
        assert_eq!(store.get_comment_count_for_task(&task()), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn set_comments_replaces_the_forest() {
        let source = store();
        let root = source.add_comment(&task(), "root", "x", None).unwrap();
        source.add_comment(&task(), "reply", "y", Some(&root.id)).unwrap();
        let snapshot = source.get_comments_by_task_id(&task());

        let target = store();
        target.add_comment(&task(), "old", "z", None).unwrap();
        target.set_comments(snapshot.clone());

        assert_eq!(target.get_comments_by_task_id(&task()), snapshot);
        assert_eq!(target.len(), 2);
    }
}
