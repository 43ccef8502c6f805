//! Application layer: context wiring, the initial load, derived projections.

pub mod builder;
pub mod calendar;
pub mod loader;

pub use self::builder::{Tracker, TrackerBuilder};
pub use self::calendar::{CalendarEvent, CalendarView, status_color};
pub use self::loader::{LOAD_ERROR_MESSAGE, LoadOutcome, TaskLoader};
