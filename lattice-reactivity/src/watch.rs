//! Watchers
//!
//! [`watch`] observes a source and calls back with the new and the previous
//! value when it changes. Unlike a plain effect, the callback does not run
//! synchronously on the write: the watcher's effect queues a job on the
//! [scheduler](crate::scheduler), so any number of writes in one synchronous
//! section produce one callback.
//!
//! # How Watchers Work
//!
//! 1. The source is turned into a getter. In deep mode the getter also
//!    [traverses](Traverse) the value it returns, so writes anywhere inside
//!    it are tracked.
//!
//! 2. The getter runs inside an effect whose notifications queue the job.
//!
//! 3. The job re-runs the getter and calls the callback when the value
//!    changed, or always in deep mode.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::adapter::{ReactiveObject, Traverse};
use crate::reactive::{EffectKind, ReactiveEffect, Signal};
use crate::scheduler::Job;

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Run the callback once at setup, with no previous value.
    pub immediate: bool,

    /// Track everything reachable from the value and call back on every
    /// notification, changed or not.
    pub deep: bool,
}

impl WatchOptions {
    /// Options with `immediate` set.
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    /// Options with `deep` set.
    pub fn deep() -> Self {
        Self {
            deep: true,
            ..Self::default()
        }
    }
}

/// What a watcher observes.
pub struct WatchSource<V> {
    getter: Arc<dyn Fn() -> V + Send + Sync>,
    forces_deep: bool,
}

impl<V> WatchSource<V> {
    /// Watch the value returned by `getter`.
    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            getter: Arc::new(getter),
            forces_deep: false,
        }
    }
}

impl WatchSource<ReactiveObject> {
    /// Watch a whole object. Always deep.
    pub fn object(object: ReactiveObject) -> Self {
        Self {
            getter: Arc::new(move || object.clone()),
            forces_deep: true,
        }
    }
}

impl From<ReactiveObject> for WatchSource<ReactiveObject> {
    fn from(object: ReactiveObject) -> Self {
        Self::object(object)
    }
}

impl<T> From<Signal<T>> for WatchSource<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        Self::getter(move || signal.get())
    }
}

type Callback<V> = Box<dyn Fn(&V, Option<&V>) + Send + Sync>;

struct Watcher<V: 'static> {
    effect: ReactiveEffect<V>,
    callback: Callback<V>,
    deep: bool,
    old: Mutex<Option<V>>,
}

impl<V> Watcher<V>
where
    V: PartialEq + Clone + Send + Sync + 'static,
{
    fn job(&self) {
        if !self.effect.is_active() {
            return;
        }

        let new = self.effect.run();
        // Swapped in before the callback so a re-entrant run compares against `new`
        let old = self.old.lock().replace(new.clone());
        if self.deep || old.as_ref() != Some(&new) {
            (self.callback)(&new, old.as_ref());
        }
    }
}

trait WatchControl: Send + Sync {
    fn stop(&self);
    fn is_active(&self) -> bool;
}

impl<V> WatchControl for Watcher<V>
where
    V: Send + Sync + 'static,
{
    fn stop(&self) {
        self.effect.stop();
    }

    fn is_active(&self) -> bool {
        self.effect.is_active()
    }
}

/// Handle to a running watcher.
///
/// The handle owns the watcher: dropping it stops the watcher.
#[must_use = "dropping a WatchHandle stops the watcher"]
pub struct WatchHandle {
    watcher: Arc<dyn WatchControl>,
}

impl WatchHandle {
    /// Stop the watcher. Queued callbacks are skipped. Never fails.
    pub fn stop(&self) {
        self.watcher.stop();
    }

    /// Check if the watcher has not been stopped.
    pub fn is_active(&self) -> bool {
        self.watcher.is_active()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.watcher.stop();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Watch `source` and call `callback(new, old)` when it changes.
///
/// The callback runs from a scheduler flush, never synchronously inside the
/// write. `old` is `None` only for the first call of an immediate watcher.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
/// let handle = watch(
///     count.clone(),
///     |new, old| println!("{old:?} -> {new}"),
///     WatchOptions::default(),
/// );
///
/// count.set(1);
/// run_microtasks(); // Prints: Some(0) -> 1
/// ```
pub fn watch<V, C>(
    source: impl Into<WatchSource<V>>,
    callback: C,
    options: WatchOptions,
) -> WatchHandle
where
    V: Traverse + PartialEq + Clone + Send + Sync + 'static,
    C: Fn(&V, Option<&V>) + Send + Sync + 'static,
{
    let source = source.into();
    let deep = options.deep || source.forces_deep;

    let getter = source.getter;
    let compute = move || {
        let value = getter();
        if deep {
            value.traverse();
        }
        value
    };

    let watcher = Arc::new_cyclic(|weak: &Weak<Watcher<V>>| {
        let weak = weak.clone();
        let job = Job::new(move || {
            if let Some(watcher) = weak.upgrade() {
                watcher.job();
            }
        });

        Watcher {
            effect: ReactiveEffect::with_kind(compute, EffectKind::Watch(job)),
            callback: Box::new(callback),
            deep,
            old: Mutex::new(None),
        }
    });

    debug!(
        effect = watcher.effect.id().raw(),
        deep,
        immediate = options.immediate,
        "watch"
    );

    if options.immediate {
        watcher.job();
    } else {
        let initial = watcher.effect.run();
        *watcher.old.lock() = Some(initial);
    }

    WatchHandle { watcher }
}
