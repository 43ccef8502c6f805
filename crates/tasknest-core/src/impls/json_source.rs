//! JsonTaskSource - task records from a JSON file.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::LoadError;
use crate::ports::{TaskRecord, TaskSource};

/// Reads the whole file on every fetch.
///
/// The file holds a JSON array of records with camelCase keys and string
/// dates, e.g. `{"id": "1", "title": "..", "deadline": "2024-06-01", ..}`.
#[derive(Debug, Clone)]
pub struct JsonTaskSource {
    path: PathBuf,
}

impl JsonTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TaskSource for JsonTaskSource {
    async fn fetch(&self) -> Result<Vec<TaskRecord>, LoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records: Vec<TaskRecord> = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), count = records.len(), "fetched task records");
        Ok(records)
    }
}
