//! In-memory stores. Each owns its state behind a lock and publishes one
//! event per committed mutation, after the lock is released.

mod forest;
pub mod comment_store;
pub mod task_store;

pub use self::comment_store::CommentStore;
pub use self::task_store::TaskStore;
