//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. The cell starts dirty. Nothing runs until the first read.
//!
//! 2. A read of a dirty cell marks it clean, runs the getter inside the
//!    cell's effect (so the getter's reads subscribe that effect) and caches
//!    the result.
//!
//! 3. Reads of a clean cell return the cache.
//!
//! 4. When a dependency changes, the cell's effect invalidates it: a clean
//!    cell turns dirty and notifies whoever read it. A cell that is already
//!    dirty ignores further invalidations.
//!
//! Every read also subscribes the active effect to the cell itself, so
//! effects and other computeds that read it are notified on invalidation.
//!
//! # Failure
//!
//! If the getter panics, the cell is put back to dirty before the panic
//! leaves [`Computed::get`], so the next read retries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::dep::Dep;
use super::effect::{EffectKind, Invalidate, ReactiveEffect};
use super::subscriber::SubscriberId;
use crate::error::{panic_message, ReactiveError};

/// Dirty state for a computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// The computed needs to recompute on next read.
    Dirty,
}

struct Cache<T> {
    state: ComputedState,
    value: Option<T>,
}

struct ComputedInner<T: 'static> {
    effect: ReactiveEffect<T>,
    cache: Mutex<Cache<T>>,
    /// Subscribers that read this computed.
    dep: Arc<Dep>,
}

impl<T: Send + 'static> Invalidate for ComputedInner<T> {
    fn invalidate(&self) {
        let became_dirty = {
            let mut cache = self.cache.lock();
            if cache.state == ComputedState::Clean {
                cache.state = ComputedState::Dirty;
                true
            } else {
                false
            }
        };

        if became_dirty {
            trace!(computed = self.effect.id().raw(), "computed invalidated");
            self.dep.trigger();
        }
    }
}

/// Puts the cell back to dirty unless the getter completed.
struct RestoreDirty<'a, T> {
    cache: &'a Mutex<Cache<T>>,
    completed: bool,
}

impl<T> Drop for RestoreDirty<'_, T> {
    fn drop(&mut self) {
        if !self.completed {
            self.cache.lock().state = ComputedState::Dirty;
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + Send + Sync.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(2);
///
/// let count_clone = count.clone();
/// let doubled = Computed::new(move || count_clone.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new computed with the given getter.
    ///
    /// The getter is not run immediately. It runs on first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|cell: &Weak<ComputedInner<T>>| {
            let cell: Weak<dyn Invalidate> = cell.clone();
            ComputedInner {
                effect: ReactiveEffect::with_kind(getter, EffectKind::Computed(cell)),
                cache: Mutex::new(Cache {
                    state: ComputedState::Dirty,
                    value: None,
                }),
                dep: Dep::new(),
            }
        });

        Self { inner }
    }

    /// Get the subscriber ID of the computed's effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.effect.id()
    }

    /// Get the current value, recomputing if dirty.
    ///
    /// # Panics
    ///
    /// Propagates a panic from the getter, and panics if the getter reads
    /// this same computed before it ever produced a value. Use
    /// [`try_get`](Self::try_get) to get an error instead.
    pub fn get(&self) -> T {
        self.inner.dep.track();

        let needs_run = {
            let mut cache = self.inner.cache.lock();
            if cache.state == ComputedState::Dirty {
                cache.state = ComputedState::Clean;
                true
            } else {
                false
            }
        };

        if needs_run {
            self.recompute();
        }

        self.inner
            .cache
            .lock()
            .value
            .clone()
            .expect("computed value read while it was being computed")
    }

    /// Get the current value, turning getter panics into errors.
    ///
    /// On error the cell stays dirty.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        if self.is_computing() {
            return Err(ReactiveError::CyclicComputed);
        }

        catch_unwind(AssertUnwindSafe(|| self.get())).map_err(|payload| {
            ReactiveError::ComputationPanicked {
                message: panic_message(payload.as_ref()),
            }
        })
    }

    fn recompute(&self) {
        let mut guard = RestoreDirty {
            cache: &self.inner.cache,
            completed: false,
        };

        let value = self.inner.effect.run();
        guard.completed = true;
        drop(guard);

        self.inner.cache.lock().value = Some(value);
        trace!(computed = self.id().raw(), "computed recomputed");
    }

    /// Clean but without a value: the getter is running right now.
    fn is_computing(&self) -> bool {
        let cache = self.inner.cache.lock();
        cache.state == ComputedState::Clean && cache.value.is_none()
    }

    /// Get the current dirty state.
    pub fn state(&self) -> ComputedState {
        self.inner.cache.lock().state
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.cache.lock().value.is_some()
    }

    /// Get the number of subscribers that read this computed.
    pub fn dependent_count(&self) -> usize {
        self.inner.dep.len()
    }

    /// Get the number of times the getter has run.
    pub fn compute_count(&self) -> usize {
        self.inner.effect.run_count()
    }

    /// The effect wrapping the getter.
    pub fn effect(&self) -> &ReactiveEffect<T> {
        &self.inner.effect
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
