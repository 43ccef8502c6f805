//! StaticTaskSource - a fixed answer for every fetch.

use async_trait::async_trait;

use crate::domain::LoadError;
use crate::ports::{TaskRecord, TaskSource};

#[derive(Debug, Clone)]
pub struct StaticTaskSource {
    outcome: Result<Vec<TaskRecord>, String>,
}

impl StaticTaskSource {
    pub fn new(records: Vec<TaskRecord>) -> Self {
        Self {
            outcome: Ok(records),
        }
    }

    /// A source whose every fetch fails with `LoadError::Source(reason)`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
        }
    }
}

#[async_trait]
impl TaskSource for StaticTaskSource {
    async fn fetch(&self) -> Result<Vec<TaskRecord>, LoadError> {
        self.outcome.clone().map_err(LoadError::Source)
    }
}
