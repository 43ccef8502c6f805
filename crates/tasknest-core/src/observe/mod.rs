//! Observation layer.
//!
//! Stores publish one event per committed mutation through a [`Notifier`].
//! Consumers wire themselves up explicitly:
//! - [`Subscription`]: raw callback per event
//! - [`Computed`]: memoized derived value, recomputed lazily after a change
//! - [`Reaction`]: side effect run when a derived value changes, optionally
//!   deferred so bursts collapse into one run

pub mod computed;
pub mod notifier;
pub mod reaction;

pub use self::computed::Computed;
pub use self::notifier::{Notifier, Subscription};
pub use self::reaction::{Reaction, ReactionOptions, reaction, reaction_when};

/// Something that publishes change events.
pub trait Observable {
    type Event: Send + Sync + 'static;

    fn notifier(&self) -> &Notifier<Self::Event>;

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Self::Event) + Send + Sync + 'static,
    {
        self.notifier().subscribe(callback)
    }
}
