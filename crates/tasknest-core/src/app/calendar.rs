//! Calendar projection of the task store.
//!
//! One [`CalendarEvent`] per task, placed on its deadline. The projection is
//! kept current by a reaction on the task list, so a burst of task mutations
//! results in a single rebuild once the delay elapses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{ObserveError, Task, TaskEvent, TaskId, TaskStatus};
use crate::observe::{Reaction, ReactionOptions, reaction_when};
use crate::store::TaskStore;
use crate::sync::lock;
use crate::text::{plain_text, truncate_text};

/// Background color of a calendar entry.
pub fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "#27ae60",
        TaskStatus::InProgress => "#f39c12",
        TaskStatus::Pending => "#e74c3c",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: TaskId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub status: TaskStatus,
    pub color: &'static str,
    /// Plain-text description, cut to the configured limit.
    pub description: String,
    /// e.g. `task-in-progress`
    pub class_name: String,
}

impl CalendarEvent {
    pub fn from_task(task: &Task, description_limit: usize) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            start: task.deadline,
            status: task.status,
            color: status_color(task.status),
            description: truncate_text(&plain_text(&task.description), description_limit),
            class_name: format!("task-{}", task.status.as_str().to_lowercase().replace(' ', "-")),
        }
    }
}

#[derive(Default)]
struct Projection {
    events: Mutex<Vec<CalendarEvent>>,
    refreshes: AtomicU64,
}

/// Live calendar projection. Dropping it stops the updates.
pub struct CalendarView {
    projection: Arc<Projection>,
    reaction: Reaction,
}

impl CalendarView {
    /// Build the projection now and keep it in sync with `store`.
    ///
    /// With `delay` set, rebuilds are deferred (requires a tokio runtime).
    pub fn attach(
        store: &TaskStore,
        delay: Option<Duration>,
        description_limit: usize,
    ) -> Result<Self, ObserveError> {
        let projection = Arc::new(Projection::default());
        let sink = Arc::clone(&projection);
        let reader = store.clone();

        let options = ReactionOptions {
            fire_immediately: true,
            delay,
        };

        // selection and flag changes cannot alter the projection
        let reaction = reaction_when(
            store,
            |event: &TaskEvent| event.change.touches_tasks(),
            move || reader.tasks(),
            move |tasks: &Vec<Task>| {
                let events: Vec<CalendarEvent> = tasks
                    .iter()
                    .map(|task| CalendarEvent::from_task(task, description_limit))
                    .collect();
                debug!(events = events.len(), "calendar rebuilt");
                *lock(&sink.events) = events;
                sink.refreshes.fetch_add(1, Ordering::SeqCst);
            },
            options,
        )?;

        Ok(Self {
            projection,
            reaction,
        })
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        lock(&self.projection.events).clone()
    }

    /// Number of rebuilds so far, including the initial one.
    pub fn refreshes(&self) -> u64 {
        self.projection.refreshes.load(Ordering::SeqCst)
    }

    /// Whether a deferred rebuild is pending.
    pub fn is_refresh_pending(&self) -> bool {
        self.reaction.is_scheduled()
    }
}

impl std::fmt::Debug for CalendarView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarView")
            .field("events", &lock(&self.projection.events).len())
            .field("refreshes", &self.refreshes())
            .finish()
    }
}
