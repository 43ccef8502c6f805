//! Domain identifiers (strongly-typed IDs).
//!
//! IDs are string newtypes so that records coming from the external task
//! source keep whatever id they were given. Freshly generated ids carry the
//! marker's prefix followed by a ULID (see `ports::id_generator`).
//!
//! `Id<T>` shares one implementation across every id type while the
//! `PhantomData<T>` marker keeps `TaskId` and `CommentId` from being mixed up
//! at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each id type.
///
/// Provides the prefix used for generated ids ("task_", "comment_").
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Wrap an existing id verbatim.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether this id was produced with the marker's prefix.
    pub fn has_generated_prefix(&self) -> bool {
        self.value.starts_with(T::prefix())
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// Marker types
// ========================================

/// Task marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskMarker {}

impl IdMarker for TaskMarker {
    fn prefix() -> &'static str {
        "task_"
    }
}

/// Comment marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommentMarker {}

impl IdMarker for CommentMarker {
    fn prefix() -> &'static str {
        "comment_"
    }
}

/// Identifier of a Task.
pub type TaskId = Id<TaskMarker>;

/// Identifier of a Comment (root or reply).
pub type CommentId = Id<CommentMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_keep_their_value_verbatim() {
        let task = TaskId::new("42");
        let comment = CommentId::from("c-1");

        assert_eq!(task.as_str(), "42");
        assert_eq!(comment.to_string(), "c-1");
        assert!(!task.has_generated_prefix());

        // let _: TaskId = comment; // <- does not compile
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("task_01ABC");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task_01ABC\"");

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(back.has_generated_prefix());
    }
}
