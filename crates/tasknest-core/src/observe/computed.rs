//! Computed: a memoized derived view.
//!
//! The value is computed on first read and cached. An event from any tracked
//! source marks the cache stale; the next read recomputes it once. Reads
//! without an intervening event return the cached value.

use std::sync::{Arc, Mutex, Weak};

use super::{Observable, Subscription};
use crate::sync::lock;

struct Cache<T> {
    value: Option<T>,
    stale: bool,
    evaluations: u64,
}

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cache: Mutex<Cache<T>>,
}

impl<T> ComputedInner<T> {
    fn invalidate(&self) {
        lock(&self.cache).stale = true;
    }
}

/// Derived value kept in sync with one or more observable sources.
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
    subscriptions: Vec<Subscription>,
}

impl<T: Clone + Send + 'static> Computed<T> {
    /// Create an untracked computed value; add sources with [`Computed::track`].
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ComputedInner {
                compute: Box::new(compute),
                cache: Mutex::new(Cache {
                    value: None,
                    stale: true,
                    evaluations: 0,
                }),
            }),
            subscriptions: Vec::new(),
        }
    }

    /// Invalidate the cache whenever `source` emits.
    pub fn track<S: Observable>(self, source: &S) -> Self {
        self.track_when(source, |_| true)
    }

    /// Invalidate the cache only for events of `source` that match `relevant`.
    pub fn track_when<S, P>(mut self, source: &S, relevant: P) -> Self
    where
        S: Observable,
        P: Fn(&S::Event) -> bool + Send + Sync + 'static,
    {
        let weak: Weak<ComputedInner<T>> = Arc::downgrade(&self.inner);
        let subscription = source.notifier().subscribe(move |event| {
            if !relevant(event) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                inner.invalidate();
            }
        });
        self.subscriptions.push(subscription);
        self
    }

    /// Current value, recomputed first if a tracked source changed.
    ///
    /// A compute that panics leaves the cache stale.
    pub fn get(&self) -> T {
        let mut cache = lock(&self.inner.cache);
        if !cache.stale {
            if let Some(value) = &cache.value {
                return value.clone();
            }
        }
        let value = (self.inner.compute)();
        cache.stale = false;
        cache.evaluations += 1;
        cache.value = Some(value.clone());
        value
    }

    pub fn is_stale(&self) -> bool {
        let cache = lock(&self.inner.cache);
        cache.stale || cache.value.is_none()
    }

    /// Number of times the compute function actually ran.
    pub fn evaluations(&self) -> u64 {
        lock(&self.inner.cache).evaluations
    }
}

impl<T> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("sources", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
