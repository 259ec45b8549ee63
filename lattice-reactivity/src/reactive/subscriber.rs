//! Subscriber types for the reactive system.
//!
//! A subscriber is anything a [`Dep`] can notify: plain effects, the effect
//! behind a computed, and watcher effects. Dependency sets and the context
//! stack only see the type-erased [`Subscriber`] view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::dep::Dep;

/// Unique identifier for a subscriber.
///
/// Each effect gets a unique ID when created. Dependency sets use it for
/// identity-based membership, so subscribing twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of an effect.
pub(crate) trait Subscriber: Send + Sync {
    fn id(&self) -> SubscriberId;

    /// Whether this subscriber is the effect of a computed cell. Those are
    /// notified before every other subscriber of the same set.
    fn is_computed(&self) -> bool;

    /// One of the subscriber's dependencies changed.
    fn notify(self: Arc<Self>);

    /// `dep` now holds this subscriber.
    fn record_dep(&self, dep: &Arc<Dep>);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_increase() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert!(first.raw() < second.raw());
    }
}
