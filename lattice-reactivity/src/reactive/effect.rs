//! Effect Implementation
//!
//! A [`ReactiveEffect`] wraps a computation. While the computation runs, the
//! effect is the active subscriber, so every tracked read subscribes it.
//! When one of those reads is later written, the effect is notified.
//!
//! # What Happens on Notification
//!
//! Depends on the effect's kind:
//!
//! - a plain effect re-runs synchronously;
//! - an effect created with a scheduler calls the scheduler instead;
//! - the effect behind a [`Computed`](super::Computed) invalidates the cell;
//! - a watcher's effect queues the watcher's job on the
//!   [scheduler](crate::scheduler).
//!
//! # Stopping
//!
//! [`ReactiveEffect::stop`] removes the effect from every dependency set it
//! joined. A stopped effect ignores notifications; running it still executes
//! the computation, but without tracking.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::debug;

use super::context::ReactiveContext;
use super::dep::Dep;
use super::subscriber::{Subscriber, SubscriberId};
use crate::scheduler::{self, Job};

/// Callback invoked instead of re-running a scheduled effect.
pub type EffectScheduler = Arc<dyn Fn() + Send + Sync>;

/// A computed cell as seen from its effect.
pub(crate) trait Invalidate: Send + Sync {
    /// An upstream dependency changed.
    fn invalidate(&self);
}

/// What an effect does when notified.
pub(crate) enum EffectKind {
    Plain,
    Scheduled(EffectScheduler),
    Computed(Weak<dyn Invalidate>),
    Watch(Job),
}

pub(crate) struct EffectCore<T> {
    id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    kind: EffectKind,
    /// Dependency sets currently holding this effect.
    deps: Mutex<SmallVec<[Weak<Dep>; 4]>>,
    active: AtomicBool,
    run_count: AtomicUsize,
}

impl<T: 'static> EffectCore<T> {
    fn run(self: &Arc<Self>) -> T {
        self.run_count.fetch_add(1, Ordering::Relaxed);
        if !self.active.load(Ordering::Acquire) {
            return (self.compute)();
        }

        let _ctx = ReactiveContext::enter(Arc::clone(self) as Arc<dyn Subscriber>);
        (self.compute)()
    }

    fn stop(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }

        let deps = std::mem::take(&mut *self.deps.lock());
        let mut removed = 0;
        for dep in deps.iter().filter_map(Weak::upgrade) {
            dep.remove(self.id);
            removed += 1;
        }
        debug!(effect = self.id.raw(), removed, "stopped effect");
    }
}

impl<T> Drop for EffectCore<T> {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().iter().filter_map(Weak::upgrade) {
            dep.remove(self.id);
        }
    }
}

impl<T: 'static> Subscriber for EffectCore<T> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_computed(&self) -> bool {
        matches!(self.kind, EffectKind::Computed(_))
    }

    fn notify(self: Arc<Self>) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        match &self.kind {
            EffectKind::Plain => {
                self.run();
            }
            EffectKind::Scheduled(scheduler) => scheduler(),
            EffectKind::Computed(cell) => {
                if let Some(cell) = cell.upgrade() {
                    cell.invalidate();
                }
            }
            EffectKind::Watch(job) => scheduler::queue_job(job.clone()),
        }
    }

    fn record_dep(&self, dep: &Arc<Dep>) {
        self.deps.lock().push(Arc::downgrade(dep));
    }
}

/// A tracked computation.
///
/// Clones share the same effect. The effect lives as long as any handle to
/// it: dependency sets only hold it weakly, so dropping every handle
/// unsubscribes it.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let count_clone = count.clone();
/// let effect = create_effect(move || {
///     println!("Count is: {}", count_clone.get());
/// }, EffectOptions::default());
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
pub struct ReactiveEffect<T: 'static> {
    core: Arc<EffectCore<T>>,
}

/// An effect run for its side effects only.
pub type Effect = ReactiveEffect<()>;

impl<T: 'static> ReactiveEffect<T> {
    /// Wrap `compute` as a plain effect. It does not run until [`run`](Self::run).
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_kind(compute, EffectKind::Plain)
    }

    /// Wrap `compute` as an effect whose notifications call `scheduler`
    /// instead of re-running it.
    pub fn with_scheduler<F, S>(compute: F, scheduler: S) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        S: Fn() + Send + Sync + 'static,
    {
        Self::with_kind(compute, EffectKind::Scheduled(Arc::new(scheduler)))
    }

    pub(crate) fn with_kind<F>(compute: F, kind: EffectKind) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            core: Arc::new(EffectCore {
                id: SubscriberId::new(),
                compute: Box::new(compute),
                kind,
                deps: Mutex::new(SmallVec::new()),
                active: AtomicBool::new(true),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the effect's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.core.id
    }

    /// Run the computation with this effect active and return its result.
    ///
    /// A panic in the computation propagates to the caller; the previously
    /// active effect is restored on the way out.
    pub fn run(&self) -> T {
        self.core.run()
    }

    /// Unsubscribe from every dependency and ignore future notifications.
    ///
    /// Never fails; stopping twice is a no-op.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Check if the effect has not been stopped.
    pub fn is_active(&self) -> bool {
        self.core.active.load(Ordering::Acquire)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::Relaxed)
    }

    /// Get the number of dependency sets this effect has joined.
    pub fn dependency_count(&self) -> usize {
        self.core.deps.lock().len()
    }

    pub(crate) fn as_subscriber(&self) -> Arc<dyn Subscriber> {
        Arc::clone(&self.core) as Arc<dyn Subscriber>
    }
}

impl<T: 'static> Clone for ReactiveEffect<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: 'static> std::fmt::Debug for ReactiveEffect<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Options for [`create_effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Do not run the effect on creation.
    pub lazy: bool,

    /// Call this on notification instead of re-running the effect.
    pub scheduler: Option<EffectScheduler>,
}

impl EffectOptions {
    /// Options for an effect that does not run on creation.
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    /// Set the notification scheduler.
    pub fn with_scheduler<S>(mut self, scheduler: S) -> Self
    where
        S: Fn() + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }
}

impl std::fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

/// Create an effect and, unless `options.lazy` is set, run it once to
/// collect its dependencies.
pub fn create_effect<T, F>(compute: F, options: EffectOptions) -> ReactiveEffect<T>
where
    T: 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let kind = match options.scheduler {
        Some(scheduler) => EffectKind::Scheduled(scheduler),
        None => EffectKind::Plain,
    };
    let effect = ReactiveEffect::with_kind(compute, kind);

    if !options.lazy {
        effect.run();
    }

    effect
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
