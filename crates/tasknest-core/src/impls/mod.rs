//! TaskSource implementations.
//!
//! - **JsonTaskSource**: reads a JSON array of task records from a file
//! - **StaticTaskSource**: fixed records (or a fixed failure), for tests and demos

pub mod json_source;
pub mod static_source;

pub use self::json_source::JsonTaskSource;
pub use self::static_source::StaticTaskSource;
