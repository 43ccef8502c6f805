//! tasknest-core
//!
//! Reactive state layer for a task tracker with nested discussion threads.
//!
//! # Modules
//! - **domain**: model types (ids, tasks, comments, change events, errors)
//! - **ports**: seams to the outside (Clock, IdGenerator, TaskSource)
//! - **observe**: subscriptions, computed views, reactions
//! - **store**: TaskStore and CommentStore
//! - **app**: Tracker context, TaskLoader, calendar projection
//! - **impls**: TaskSource implementations (JSON file, static)
//! - **config** / **validate** / **text**: settings, caller-side checks,
//!   rich-text helpers

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observe;
pub mod ports;
pub mod store;
pub mod text;
pub mod validate;

mod sync;

pub use app::{Tracker, TrackerBuilder};
pub use config::TrackerConfig;
