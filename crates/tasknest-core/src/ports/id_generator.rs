//! IdGenerator port - id generation.
//!
//! # Implementations
//! - **UlidGenerator**: prefix + ULID built from the injected clock and a
//!   random suffix.

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ids::{CommentMarker, Id, IdMarker, TaskMarker};
use crate::domain::{CommentId, TaskId};
use crate::ports::Clock;

/// IdGenerator produces collision-resistant string ids.
///
/// Only `generate` is required; the typed helpers prepend the marker prefix.
pub trait IdGenerator: Send + Sync {
    /// Produce `prefix` followed by a unique suffix.
    fn generate(&self, prefix: &str) -> String;

    fn generate_task_id(&self) -> TaskId {
        typed::<TaskMarker, Self>(self)
    }

    fn generate_comment_id(&self) -> CommentId {
        typed::<CommentMarker, Self>(self)
    }
}

fn typed<T: IdMarker, G: IdGenerator + ?Sized>(id_gen: &G) -> Id<T> {
    Id::new(id_gen.generate(T::prefix()))
}

/// ULID based generator.
///
/// The 48-bit time part comes from the clock (milliseconds), the 80-bit
/// random part from `rand`. With a `FixedClock` the time part is stable,
/// which keeps generated ids predictable in tests.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate(&self, prefix: &str) -> String {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        format!("{prefix}{ulid}")
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for Arc<G> {
    fn generate(&self, prefix: &str) -> String {
        (**self).generate(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let ids: HashSet<String> = (0..1000).map(|_| id_gen.generate("x_")).collect();

        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_the_time_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate("");
        let id2 = id_gen.generate("");

        // random part still differs
        assert_ne!(id1, id2);

        let ts1 = Ulid::from_str(&id1).unwrap().timestamp_ms();
        let ts2 = Ulid::from_str(&id2).unwrap().timestamp_ms();
        assert_eq!(ts1, ts2);
        assert_eq!(ts1, fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn typed_ids_carry_their_prefix() {
        let id_gen = UlidGenerator::new(SystemClock);

        let task_id = id_gen.generate_task_id();
        let comment_id = id_gen.generate_comment_id();

        assert!(task_id.as_str().starts_with("task_"));
        assert!(comment_id.as_str().starts_with("comment_"));
        assert!(task_id.has_generated_prefix());
    }
}
