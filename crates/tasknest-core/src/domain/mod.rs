//! Domain model (ids, tasks, comments, change events, errors).

pub mod comment;
pub mod errors;
pub mod events;
pub mod ids;
pub mod task;

pub use comment::Comment;
pub use errors::{
    CommentError, ConfigError, ErrorKind, LoadError, ObserveError, ValidationError,
};
pub use events::{CommentChange, CommentEvent, StoreEvent, TaskChange, TaskEvent};
pub use ids::{CommentId, Id, IdMarker, TaskId};
pub use task::{Task, TaskFormData, TaskPatch, TaskStatus};
