//! TaskLoader - fills the task store from a [`TaskSource`].
//!
//! # Flow
//! 1. skip if the store already holds tasks (`load` only)
//! 2. `set_loading(true)`, `set_error(None)`
//! 3. fetch and parse every record
//! 4. success: `set_tasks`; failure: `set_error(message)`
//! 5. `set_loading(false)` on every exit path, including a dropped future

use tracing::{error, info};

use crate::domain::{LoadError, Task};
use crate::ports::TaskSource;
use crate::store::TaskStore;

/// Message stored in the task store when a load fails.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load tasks. Please try again.";

/// Result of a successful load call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The store was replaced with this many tasks.
    Loaded(usize),
    /// The store already held tasks; nothing was fetched.
    Skipped,
}

pub struct TaskLoader<S> {
    store: TaskStore,
    source: S,
    error_message: String,
}

impl<S: TaskSource> TaskLoader<S> {
    pub fn new(store: TaskStore, source: S) -> Self {
        Self {
            store,
            source,
            error_message: LOAD_ERROR_MESSAGE.to_string(),
        }
    }

    /// Use a different message for the store's error on failure.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Load unless the store already holds tasks.
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        if !self.store.is_empty() {
            return Ok(LoadOutcome::Skipped);
        }
        self.reload().await
    }

    /// Fetch and replace the store's tasks unconditionally.
    ///
    /// A single malformed record fails the whole load; the store keeps its
    /// previous tasks in that case.
    pub async fn reload(&self) -> Result<LoadOutcome, LoadError> {
        let _loading = LoadingGuard::start(&self.store);
        self.store.set_error(None);

        match self.fetch_tasks().await {
            Ok(tasks) => {
                let count = tasks.len();
                self.store.set_tasks(tasks);
                info!(count, "tasks loaded");
                Ok(LoadOutcome::Loaded(count))
            }
            Err(err) => {
                error!(error = %err, "failed to load tasks");
                self.store.set_error(Some(self.error_message.clone()));
                Err(err)
            }
        }
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>, LoadError> {
        let records = self.source.fetch().await?;
        records.into_iter().map(|record| record.into_task()).collect()
    }
}

/// Sets `is_loading` on creation and clears it on drop.
struct LoadingGuard<'a> {
    store: &'a TaskStore,
}

impl<'a> LoadingGuard<'a> {
    fn start(store: &'a TaskStore) -> Self {
        store.set_loading(true);
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}
