//! Ports - seams to the outside world.
//!
//! Each trait hides something the stores must not depend on directly: the
//! wall clock, id randomness, and the external task fetch.

pub mod clock;
pub mod id_generator;
pub mod task_source;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_source::{TaskRecord, TaskSource, parse_instant};
