//! TrackerBuilder - wiring of the stores and their collaborators.
//!
//! There are no global stores: a [`Tracker`] is built once and its store
//! handles are cloned into whatever needs them.

use std::sync::Arc;

use tracing::debug;

use super::calendar::CalendarView;
use super::loader::TaskLoader;
use crate::config::TrackerConfig;
use crate::domain::{CommentChange, CommentEvent, ConfigError, ObserveError, TaskId};
use crate::observe::Computed;
use crate::ports::{Clock, IdGenerator, SystemClock, TaskSource, UlidGenerator};
use crate::store::{CommentStore, TaskStore};
use crate::validate::Validator;

/// Builds a [`Tracker`].
///
/// # Example
/// ```ignore
/// let tracker = TrackerBuilder::new()
///     .config(TrackerConfig::load("tasknest.toml").await?)
///     .build()?;
/// ```
#[derive(Default)]
pub struct TrackerBuilder {
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: Option<TrackerConfig>,
}

impl TrackerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock for timestamps (default: system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Id source (default: ULIDs stamped by the configured clock).
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the config and create empty stores.
    pub fn build(self) -> Result<Tracker, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        debug!(?config, "tracker built");
        Ok(Tracker {
            tasks: TaskStore::new(Arc::clone(&clock), Arc::clone(&ids)),
            comments: CommentStore::new(Arc::clone(&clock), ids),
            config,
            clock,
        })
    }
}

/// Application context: both stores plus the settings views are built from.
#[derive(Clone)]
pub struct Tracker {
    pub tasks: TaskStore,
    pub comments: CommentStore,
    pub config: TrackerConfig,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn validator(&self) -> Validator {
        Validator::new(&self.config)
    }

    /// Loader that fills this tracker's task store from `source`.
    pub fn loader<S: TaskSource>(&self, source: S) -> TaskLoader<S> {
        TaskLoader::new(self.tasks.clone(), source)
    }

    /// Calendar projection using the configured delay and description limit.
    pub fn calendar(&self) -> Result<CalendarView, ObserveError> {
        CalendarView::attach(
            &self.tasks,
            self.config.reaction_delay(),
            self.config.calendar_description_limit,
        )
    }

    /// Live count of all comments (replies included) on one task.
    ///
    /// Only changes to that task's threads, or a full replacement, mark the
    /// count stale.
    pub fn comment_count(&self, task_id: &TaskId) -> Computed<usize> {
        let comments = self.comments.clone();
        let counted = task_id.clone();
        let watched = task_id.clone();
        Computed::new(move || comments.get_comment_count_for_task(&counted)).track_when(
            &self.comments,
            move |event: &CommentEvent| match &event.change {
                CommentChange::Replaced { .. } => true,
                change => change.task_id() == Some(&watched),
            },
        )
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("tasks", &self.tasks)
            .field("comments", &self.comments)
            .field("config", &self.config)
            .finish()
    }
}
