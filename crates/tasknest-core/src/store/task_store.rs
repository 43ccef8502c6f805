//! Task store: the task collection, selection and load flags.
//!
//! # Implementation
//! - `TaskState` behind one `RwLock`; every mutation goes through `commit`
//! - `commit` bumps the version and builds the event under the lock, then
//!   emits after releasing it
//! - Stored `Task`s are replaced, never edited, so snapshots stay valid
//!
//! # Usage
//! ```ignore
//! let store = TaskStore::new(clock, ids);
//! let _sub = store.subscribe(|event| println!("{:?}", event.change));
//! let task = store.add_task(form);
//! store.update_task(&task.id, TaskPatch::default().status(TaskStatus::Completed));
//! ```

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::domain::{Task, TaskChange, TaskEvent, TaskFormData, TaskId, TaskPatch, TaskStatus};
use crate::observe::{Notifier, Observable};
use crate::ports::{Clock, IdGenerator};
use crate::sync::{read, write};

#[derive(Debug, Default)]
struct TaskState {
    /// Insertion order is display order.
    tasks: Vec<Task>,
    /// Always refers to a task in `tasks`.
    selected: Option<TaskId>,
    is_loading: bool,
    error: Option<String>,
    version: u64,
}

impl TaskState {
    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    fn contains(&self, id: &TaskId) -> bool {
        self.position(id).is_some()
    }
}

/// Owner of the task collection.
///
/// Cloning yields another handle to the same store. Every mutation commits
/// under one write lock and then emits exactly one `TaskEvent`, after the lock
/// is released; no-op mutations emit nothing.
#[derive(Clone)]
pub struct TaskStore {
    state: Arc<RwLock<TaskState>>,
    notifier: Notifier<TaskEvent>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(TaskState::default())),
            notifier: Notifier::new(),
            clock,
            ids,
        }
    }

    /// Apply `op` under the write lock, then publish its change (if any).
    fn commit<R>(&self, op: impl FnOnce(&mut TaskState) -> (R, Option<TaskChange>)) -> R {
        let (result, event) = {
            let mut state = write(&self.state);
            let (result, change) = op(&mut state);
            let event = change.map(|change| {
                state.version += 1;
                TaskEvent::new(state.version, change)
            });
            (result, event)
        }; // lock released here

        if let Some(event) = event {
            debug!(version = event.version, change = ?event.change, "task store changed");
            self.notifier.emit(&event);
        }
        result
    }

    // ========================================
    // Mutations
    // ========================================

    /// Replace the whole collection and clear the error.
    ///
    /// Later duplicates of an id are dropped. The selection is cleared when its
    /// task is not in the new list.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        let mut seen = HashSet::with_capacity(tasks.len());
        let mut unique = Vec::with_capacity(tasks.len());
        for task in tasks {
            if seen.insert(task.id.clone()) {
                unique.push(task);
            } else {
                warn!(task_id = %task.id, "duplicate task id in replacement list; keeping the first");
            }
        }

        self.commit(|state| {
            state.tasks = unique;
            state.error = None;
            let selection_gone = state
                .selected
                .as_ref()
                .is_some_and(|id| !state.tasks.iter().any(|t| &t.id == id));
            if selection_gone {
                state.selected = None;
            }
            let count = state.tasks.len();
            ((), Some(TaskChange::Replaced { count }))
        })
    }

    /// Select a task by id, or clear the selection with `None`.
    ///
    /// Returns false (and changes nothing) if the id is not in the collection.
    pub fn set_selected_task(&self, id: Option<&TaskId>) -> bool {
        self.commit(|state| match id {
            None if state.selected.is_none() => (true, None),
            None => {
                state.selected = None;
                (true, Some(TaskChange::Selected(None)))
            }
            Some(id) if !state.contains(id) => (false, None),
            Some(id) if state.selected.as_ref() == Some(id) => (true, None),
            Some(id) => {
                state.selected = Some(id.clone());
                (true, Some(TaskChange::Selected(Some(id.clone()))))
            }
        })
    }

    pub fn set_loading(&self, loading: bool) {
        self.commit(|state| {
            if state.is_loading == loading {
                return ((), None);
            }
            state.is_loading = loading;
            ((), Some(TaskChange::Loading(loading)))
        })
    }

    pub fn set_error(&self, error: Option<String>) {
        self.commit(|state| {
            if state.error == error {
                return ((), None);
            }
            state.error = error.clone();
            ((), Some(TaskChange::Error(error)))
        })
    }

    /// Create a task from form data and append it.
    pub fn add_task(&self, data: TaskFormData) -> Task {
        let now = self.clock.now();
        self.commit(|state| {
            let mut id = self.ids.generate_task_id();
            while state.contains(&id) {
                id = self.ids.generate_task_id();
            }
            let task = Task::from_form(id, data, now);
            state.tasks.push(task.clone());
            let change = TaskChange::Added(task.id.clone());
            (task, Some(change))
        })
    }

    /// Merge `patch` into the task with `id`.
    ///
    /// The stored value is replaced, not edited in place. Returns false when no
    /// task has that id.
    pub fn update_task(&self, id: &TaskId, patch: TaskPatch) -> bool {
        let now = self.clock.now();
        self.commit(|state| {
            let Some(index) = state.position(id) else {
                return (false, None);
            };
            let updated = state.tasks[index].patched(patch, now);
            state.tasks[index] = updated;
            (true, Some(TaskChange::Updated(id.clone())))
        })
    }

    /// Remove the task with `id`, clearing the selection if it pointed there.
    pub fn delete_task(&self, id: &TaskId) -> bool {
        self.commit(|state| {
            let Some(index) = state.position(id) else {
                return (false, None);
            };
            state.tasks.remove(index);
            if state.selected.as_ref() == Some(id) {
                state.selected = None;
            }
            (true, Some(TaskChange::Deleted(id.clone())))
        })
    }

    /// Drop all tasks, the selection and the error.
    pub fn clear_tasks(&self) {
        self.commit(|state| {
            if state.tasks.is_empty() && state.selected.is_none() && state.error.is_none() {
                return ((), None);
            }
            state.tasks.clear();
            state.selected = None;
            state.error = None;
            ((), Some(TaskChange::Cleared))
        })
    }

    // ========================================
    // Queries
    // ========================================

    pub fn get_task_by_id(&self, id: &TaskId) -> Option<Task> {
        read(&self.state).tasks.iter().find(|t| &t.id == id).cloned()
    }

    /// Snapshot of every task in display order.
    pub fn tasks(&self) -> Vec<Task> {
        read(&self.state).tasks.clone()
    }

    /// Run `f` against the current tasks without cloning them.
    pub fn with_tasks<R>(&self, f: impl FnOnce(&[Task]) -> R) -> R {
        f(&read(&self.state).tasks)
    }

    pub fn len(&self) -> usize {
        read(&self.state).tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.state).tasks.is_empty()
    }

    /// The selected task as currently stored (reflects later updates).
    pub fn selected_task(&self) -> Option<Task> {
        let state = read(&self.state);
        let id = state.selected.as_ref()?;
        state.tasks.iter().find(|t| &t.id == id).cloned()
    }

    pub fn selected_task_id(&self) -> Option<TaskId> {
        read(&self.state).selected.clone()
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state).is_loading
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    /// Number of committed mutations so far.
    pub fn version(&self) -> u64 {
        read(&self.state).version
    }

    // ========================================
    // Derived views
    // ========================================

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.with_tasks(|tasks| {
            tasks
                .iter()
                .filter(|t| t.status == status)
                .cloned()
                .collect()
        })
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.tasks_by_status(TaskStatus::Pending)
    }

    pub fn in_progress_tasks(&self) -> Vec<Task> {
        self.tasks_by_status(TaskStatus::InProgress)
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.tasks_by_status(TaskStatus::Completed)
    }

    /// Earliest deadline first; ties keep display order.
    pub fn tasks_by_deadline(&self) -> Vec<Task> {
        let mut tasks = self.tasks();
        tasks.sort_by_key(|t| t.deadline);
        tasks
    }

    /// Newest first by creation time; ties keep display order.
    pub fn tasks_by_newest(&self) -> Vec<Task> {
        let mut tasks = self.tasks();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Tasks whose deadline has passed and that are not completed.
    pub fn overdue_tasks(&self) -> Vec<Task> {
        let now = self.clock.now();
        self.with_tasks(|tasks| tasks.iter().filter(|t| t.is_overdue(now)).cloned().collect())
    }
}

impl Observable for TaskStore {
    type Event = TaskEvent;

    fn notifier(&self) -> &Notifier<TaskEvent> {
        &self.notifier
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = read(&self.state);
        f.debug_struct("TaskStore")
            .field("tasks", &state.tasks.len())
            .field("selected", &state.selected)
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
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    }

    fn store() -> (TaskStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(t0()));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        (TaskStore::new(clock.clone(), ids), clock)
    }

    fn form(title: &str, deadline_days: i64, status: TaskStatus) -> TaskFormData {
        TaskFormData {
            title: title.into(),
            description: format!("<p>{title}</p>"),
            deadline: t0() + Duration::days(deadline_days),
            status,
        }
    }

    fn record_events(store: &TaskStore) -> (Arc<Mutex<Vec<TaskEvent>>>, crate::observe::Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        (events, sub)
    }

    #[test]
    fn added_task_round_trips() {
        let (store, _) = store();
        let data = form("A", 3, TaskStatus::Pending);

        let created = store.add_task(data.clone());
        let found = store.get_task_by_id(&created.id).unwrap();

        assert_eq!(found.title, "A");
        assert_eq!(found.description, data.description);
        assert_eq!(found.deadline, data.deadline);
        assert_eq!(found.status, TaskStatus::Pending);
        assert!(found.id.has_generated_prefix());
        assert_eq!(found.created_at, found.updated_at);
        assert_eq!(found.created_at, t0());
    }

    #[test]
    fn ids_stay_unique_across_adds_and_deletes() {
        let (store, _) = store();
        for i in 0..50 {
            let task = store.add_task(form(&format!("t{i}"), 1, TaskStatus::Pending));
            if i % 3 == 0 {
                assert!(store.delete_task(&task.id));
            }
        }

        let tasks = store.tasks();
        let unique: HashSet<_> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(tasks.len(), 33);
        assert_eq!(unique.len(), tasks.len());
    }

    #[test]
    fn update_replaces_value_and_refreshes_selection() {
        let (store, clock) = store();
        let task = store.add_task(form("Draft", 2, TaskStatus::Pending));
        assert!(store.set_selected_task(Some(&task.id)));
        let before = store.selected_task().unwrap();

        clock.advance(Duration::minutes(10));
        assert!(store.update_task(&task.id, TaskPatch::default().title("Final")));

        let selected = store.selected_task().unwrap();
        assert_eq!(selected.title, "Final");
        assert_eq!(selected.updated_at, t0() + Duration::minutes(10));
        assert_eq!(selected.created_at, t0());
        // snapshot taken earlier is unaffected
        assert_eq!(before.title, "Draft");
    }

    #[test]
    fn update_of_unknown_id_changes_nothing() {
        let (store, _) = store();
        let task = store.add_task(form("Keep", 1, TaskStatus::Pending));
        store.set_selected_task(Some(&task.id));
        store.set_error(Some("boom".into()));
        let version = store.version();
        let (events, _sub) = record_events(&store);

        let ok = store.update_task(&TaskId::new("missing"), TaskPatch::default().title("x"));

        assert!(!ok);
        assert_eq!(store.tasks(), vec![task.clone()]);
        assert_eq!(store.selected_task_id(), Some(task.id));
        assert_eq!(store.error().as_deref(), Some("boom"));
        assert_eq!(store.version(), version);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn deleting_selected_task_clears_selection() {
        let (store, _) = store();
        let a = store.add_task(form("A", 1, TaskStatus::Pending));
        let b = store.add_task(form("B", 1, TaskStatus::Pending));
        store.set_selected_task(Some(&a.id));

        assert!(store.delete_task(&b.id));
        assert_eq!(store.selected_task_id(), Some(a.id.clone()));

        assert!(store.delete_task(&a.id));
        assert_eq!(store.selected_task_id(), None);
        assert!(!store.delete_task(&a.id));
    }

    #[test]
    fn selecting_unknown_task_is_rejected() {
        let (store, _) = store();
        assert!(!store.set_selected_task(Some(&TaskId::new("nope"))));
        assert_eq!(store.selected_task(), None);
    }

    #[test]
    fn set_tasks_replaces_clears_error_and_drops_stale_selection() {
        let (store, _) = store();
        let old = store.add_task(form("Old", 1, TaskStatus::Pending));
        store.set_selected_task(Some(&old.id));
        store.set_error(Some("failed".into()));

        let mut fresh = store.add_task(form("Fresh", 1, TaskStatus::Pending));
        fresh.title = "Loaded".into();
        let mut dup = fresh.clone();
        dup.title = "Duplicate".into();
        store.set_tasks(vec![fresh.clone(), dup]);

        assert_eq!(store.tasks(), vec![fresh]);
        assert_eq!(store.error(), None);
        assert_eq!(store.selected_task_id(), None);
    }

    #[test]
    fn clear_tasks_resets_everything() {
        let (store, _) = store();
        let a = store.add_task(form("A", 1, TaskStatus::Pending));
        store.set_selected_task(Some(&a.id));
        store.set_error(Some("x".into()));

        store.clear_tasks();

        assert!(store.is_empty());
        assert_eq!(store.selected_task(), None);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn each_mutation_emits_exactly_one_event() {
        let (store, _) = store();
        let (events, _sub) = record_events(&store);

        let a = store.add_task(form("A", 1, TaskStatus::Pending));
        store.update_task(&a.id, TaskPatch::default().status(TaskStatus::Completed));
        store.set_loading(true);
        store.set_loading(true);
        store.set_selected_task(Some(&a.id));
        store.delete_task(&a.id);

        let events = events.lock().unwrap();
        let changes: Vec<_> = events.iter().map(|e| e.change.clone()).collect();
        assert_eq!(
            changes,
            vec![
                TaskChange::Added(a.id.clone()),
                TaskChange::Updated(a.id.clone()),
                TaskChange::Loading(true),
                TaskChange::Selected(Some(a.id.clone())),
                TaskChange::Deleted(a.id.clone()),
            ]
        );
        let versions: Vec<u64> = events.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn subscribers_see_post_mutation_state() {
        let (store, _) = store();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let reader = store.clone();
        let _sub = store.subscribe(move |_| sink.lock().unwrap().push(reader.len()));

        store.add_task(form("A", 1, TaskStatus::Pending));
        store.add_task(form("B", 1, TaskStatus::Pending));

        assert_eq!(*observed.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn derived_views() {
        let (store, clock) = store();
        let late = store.add_task(form("late", -2, TaskStatus::InProgress));
        clock.advance(Duration::seconds(1));
        let done = store.add_task(form("done", -1, TaskStatus::Completed));
        clock.advance(Duration::seconds(1));
        let soon = store.add_task(form("soon", 1, TaskStatus::Pending));

        let titles = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.title).collect::<Vec<_>>();

        assert_eq!(titles(store.pending_tasks()), vec!["soon"]);
        assert_eq!(titles(store.in_progress_tasks()), vec!["late"]);
        assert_eq!(titles(store.completed_tasks()), vec!["done"]);
        assert_eq!(titles(store.tasks_by_deadline()), vec!["late", "done", "soon"]);
        assert_eq!(titles(store.tasks_by_newest()), vec!["soon", "done", "late"]);
        assert_eq!(store.overdue_tasks(), vec![late]);

        // the clock drives "overdue"
        clock.advance(Duration::days(2));
        let overdue: Vec<TaskId> = store.overdue_tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(overdue.len(), 2);
        assert!(overdue.contains(&soon.id));
        assert!(!overdue.contains(&done.id));
    }

    #[test]
    fn repeated_reads_are_stable() {
        let (store, _) = store();
        let a = store.add_task(form("A", 1, TaskStatus::Pending));

        assert_eq!(store.get_task_by_id(&a.id), store.get_task_by_id(&a.id));
        assert_eq!(store.tasks(), store.tasks());
    }
}
