//! Reaction: run a side effect when a derived value changes.
//!
//! `reaction(source, expression, effect, options)` re-evaluates `expression`
//! after every event of `source` and calls `effect` only when the result
//! differs from the previous one.
//!
//! With `options.delay` set, events schedule a single evaluation on a tokio
//! timer; further events before it fires are absorbed, so a burst of
//! mutations yields one evaluation against the final state.
//!
//! Disposal (explicit or by dropping the `Reaction`) unsubscribes, cancels a
//! pending timer and drops the captured closures. Subscribers and timers only
//! hold `Weak` references to the reaction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{Observable, Subscription};
use crate::domain::ObserveError;
use crate::sync::lock;

/// Upper bound on back-to-back re-evaluations caused by an effect that keeps
/// mutating its own source.
const MAX_RERUNS: u32 = 100;

/// Options for [`reaction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionOptions {
    /// Run the effect once with the initial value at creation.
    pub fire_immediately: bool,
    /// Defer evaluation after an event by this long (needs a tokio runtime).
    pub delay: Option<Duration>,
}

impl ReactionOptions {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            fire_immediately: false,
            delay: Some(delay),
        }
    }

    pub fn fire_immediately(mut self) -> Self {
        self.fire_immediately = true;
        self
    }
}

struct Tracked<T> {
    last: Option<T>,
    effect: Box<dyn FnMut(&T) + Send>,
}

struct ReactionCore<T> {
    expression: Box<dyn Fn() -> T + Send + Sync>,
    tracked: Mutex<Tracked<T>>,
    delay: Option<(Duration, Handle)>,
    pending: Mutex<Option<JoinHandle<()>>>,
    scheduled: AtomicBool,
    running: AtomicBool,
    rerun: AtomicBool,
    disposed: AtomicBool,
    evaluations: AtomicU64,
    effect_runs: AtomicU64,
}

/// Clears the `running` flag even if the effect unwinds.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<T: PartialEq + Send + 'static> ReactionCore<T> {
    fn on_event(self: &Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        match &self.delay {
            None => self.run(),
            Some((delay, handle)) => self.schedule(*delay, handle),
        }
    }

    fn schedule(self: &Arc<Self>, delay: Duration, handle: &Handle) {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(core) = weak.upgrade() {
                core.scheduled.store(false, Ordering::SeqCst);
                core.run();
            }
        });
        *lock(&self.pending) = Some(task);
    }

    fn run(&self) {
        let mut passes = 0;
        loop {
            if self.disposed.load(Ordering::SeqCst) {
                return;
            }
            if self.running.swap(true, Ordering::SeqCst) {
                // re-entered from our own effect (or another thread): let the
                // active pass pick it up
                self.rerun.store(true, Ordering::SeqCst);
                return;
            }
            self.rerun.store(false, Ordering::SeqCst);
            {
                let _running = RunningGuard(&self.running);
                self.evaluate();
            }

            if !self.rerun.load(Ordering::SeqCst) {
                return;
            }
            passes += 1;
            if passes >= MAX_RERUNS {
                tracing::warn!(passes, "reaction keeps invalidating itself; giving up");
                return;
            }
        }
    }

    fn compute(&self) -> T {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        (self.expression)()
    }

    fn evaluate(&self) {
        let value = self.compute();
        let mut tracked = lock(&self.tracked);
        if tracked.last.as_ref() == Some(&value) {
            return;
        }
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.effect_runs.fetch_add(1, Ordering::SeqCst);
        (tracked.effect)(&value);
        tracked.last = Some(value);
    }
}

trait ReactionControl: Send + Sync {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
    fn effect_runs(&self) -> u64;
    fn evaluations(&self) -> u64;
    fn is_scheduled(&self) -> bool;
}

impl<T: Send + 'static> ReactionControl for ReactionCore<T> {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.pending).take() {
            task.abort();
        }
        self.scheduled.store(false, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn effect_runs(&self) -> u64 {
        self.effect_runs.load(Ordering::SeqCst)
    }

    fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::SeqCst)
    }

    fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }
}

/// A live reaction. Dropping it disposes it.
#[must_use = "dropping a Reaction disposes it immediately"]
pub struct Reaction {
    core: Arc<dyn ReactionControl>,
    subscription: Option<Subscription>,
}

impl Reaction {
    /// Stop reacting and release the captured closures.
    pub fn dispose(self) {}

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// How many times the effect has run.
    pub fn effect_runs(&self) -> u64 {
        self.core.effect_runs()
    }

    /// How many times the expression has been evaluated, creation included.
    pub fn evaluations(&self) -> u64 {
        self.core.evaluations()
    }

    /// Whether a delayed evaluation is waiting on its timer.
    pub fn is_scheduled(&self) -> bool {
        self.core.is_scheduled()
    }
}

impl Drop for Reaction {
    fn drop(&mut self) {
        self.core.dispose();
        if let Some(subscription) = self.subscription.take() {
            subscription.dispose();
        }
    }
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("disposed", &self.is_disposed())
            .field("effect_runs", &self.effect_runs())
            .finish()
    }
}

/// Register a reaction on `source`.
///
/// The expression is evaluated once at creation to establish the baseline;
/// the effect runs then only if `options.fire_immediately` is set.
pub fn reaction<S, T, X, F>(
    source: &S,
    expression: X,
    effect: F,
    options: ReactionOptions,
) -> Result<Reaction, ObserveError>
where
    S: Observable,
    T: PartialEq + Send + 'static,
    X: Fn() -> T + Send + Sync + 'static,
    F: FnMut(&T) + Send + 'static,
{
    reaction_when(source, |_| true, expression, effect, options)
}

/// Like [`reaction`], but events for which `relevant` returns false are
/// ignored without evaluating the expression.
pub fn reaction_when<S, P, T, X, F>(
    source: &S,
    relevant: P,
    expression: X,
    effect: F,
    options: ReactionOptions,
) -> Result<Reaction, ObserveError>
where
    S: Observable,
    P: Fn(&S::Event) -> bool + Send + Sync + 'static,
    T: PartialEq + Send + 'static,
    X: Fn() -> T + Send + Sync + 'static,
    F: FnMut(&T) + Send + 'static,
{
    let delay = match options.delay {
        Some(delay) => {
            let handle = Handle::try_current().map_err(|_| ObserveError::NoRuntime)?;
            Some((delay, handle))
        }
        None => None,
    };

    let core = Arc::new(ReactionCore {
        expression: Box::new(expression),
        tracked: Mutex::new(Tracked {
            last: None,
            effect: Box::new(effect),
        }),
        delay,
        pending: Mutex::new(None),
        scheduled: AtomicBool::new(false),
        running: AtomicBool::new(false),
        rerun: AtomicBool::new(false),
        disposed: AtomicBool::new(false),
        evaluations: AtomicU64::new(0),
        effect_runs: AtomicU64::new(0),
    });

    let initial = core.compute();
    {
        let mut tracked = lock(&core.tracked);
        if options.fire_immediately {
            core.effect_runs.fetch_add(1, Ordering::SeqCst);
            (tracked.effect)(&initial);
        }
        tracked.last = Some(initial);
    }

    let weak: Weak<ReactionCore<T>> = Arc::downgrade(&core);
    let subscription = source.notifier().subscribe(move |event| {
        if !relevant(event) {
            return;
        }
        if let Some(core) = weak.upgrade() {
            core.on_event();
        }
    });

    Ok(Reaction {
        core,
        subscription: Some(subscription),
    })
}
