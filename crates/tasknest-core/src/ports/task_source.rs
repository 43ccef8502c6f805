//! TaskSource port - the external collaborator that supplies the initial
//! task list.
//!
//! Records arrive with their date fields as strings; `TaskRecord::into_task`
//! parses them before anything reaches the task store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LoadError, Task, TaskId, TaskStatus};

/// Raw task as delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRecord {
    /// Parse the date fields and build a `Task`.
    pub fn into_task(self) -> Result<Task, LoadError> {
        let deadline = parse_instant(&self.id, "deadline", &self.deadline)?;
        let created_at = parse_instant(&self.id, "createdAt", &self.created_at)?;
        let updated_at = parse_instant(&self.id, "updatedAt", &self.updated_at)?;
        Ok(Task {
            id: TaskId::new(self.id),
            title: self.title,
            description: self.description,
            deadline,
            status: self.status,
            created_at,
            updated_at,
        })
    }
}

/// Parse a serialized instant.
///
/// Accepts RFC 3339, a naive date-time (taken as UTC) or a bare date (UTC
/// midnight).
pub fn parse_instant(
    task: &str,
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, LoadError> {
    let raw = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(LoadError::InvalidDate {
        task: task.to_string(),
        field,
        value: value.to_string(),
    })
}

/// TaskSource fetches the initial task records.
///
/// A fetch may be abandoned by dropping its future; implementations must not
/// rely on running to completion.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TaskRecord>, LoadError>;
}
