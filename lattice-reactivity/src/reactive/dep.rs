//! Dependency sets.
//!
//! A [`Dep`] is the subscriber list of one observed key (or of one computed
//! or signal). Triggering it notifies every live subscriber in two passes:
//! computed effects first, then everything else.
//!
//! The order matters. A computed's invalidation has to run before any
//! consumer re-reads the computed. If a consumer ran first, its read would
//! clear the dirty flag, and the computed's own invalidation arriving after
//! it would flip the flag back and notify the consumer again, which reads
//! again, and so on without end when the consumer reads the computed twice.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// The set of effects subscribed to one observed key.
///
/// Membership is keyed by [`SubscriberId`] and keeps insertion order, so
/// notification order is deterministic. Subscribers are held weakly: a
/// dependency set never keeps an effect alive.
#[derive(Default)]
pub struct Dep {
    subscribers: Mutex<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl Dep {
    /// Create an empty dependency set.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe the active effect, if there is one.
    pub fn track(self: &Arc<Self>) {
        if let Some(active) = ReactiveContext::current() {
            self.add(&active);
        }
    }

    /// Notify every subscriber, computed effects first.
    ///
    /// Iterates over a snapshot: subscribers added or removed while the
    /// notifications run do not affect this round. The effect that is
    /// currently running is skipped, so an effect writing a key it reads
    /// does not recurse into itself.
    pub fn trigger(&self) {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return;
        }

        let running = ReactiveContext::current_subscriber();
        let (computed, plain): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .filter(|subscriber| Some(subscriber.id()) != running)
            .partition(|subscriber| subscriber.is_computed());

        trace!(
            computed = computed.len(),
            plain = plain.len(),
            "triggering dependency set"
        );

        for subscriber in computed {
            subscriber.notify();
        }
        for subscriber in plain {
            subscriber.notify();
        }
    }

    /// Number of subscribers, including ones whose effect has been dropped
    /// but not yet pruned.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Check if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Check if `id` is subscribed.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    pub(crate) fn add(self: &Arc<Self>, subscriber: &Arc<dyn Subscriber>) {
        let inserted = {
            let mut subscribers = self.subscribers.lock();
            if subscribers.contains_key(&subscriber.id()) {
                false
            } else {
                subscribers.insert(subscriber.id(), Arc::downgrade(subscriber));
                true
            }
        };

        if inserted {
            subscriber.record_dep(self);
        }
    }

    pub(crate) fn remove(&self, id: SubscriberId) {
        self.subscribers.lock().shift_remove(&id);
    }

    /// Upgrade every live subscriber and prune the dead ones.
    fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        let mut subscribers = self.subscribers.lock();
        let mut live = Vec::with_capacity(subscribers.len());
        subscribers.retain(|_, weak| match weak.upgrade() {
            Some(subscriber) => {
                live.push(subscriber);
                true
            }
            None => false,
        });
        live
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::subscriber::mock::MockSubscriber;

    fn log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn computed_subscribers_are_notified_first() {
        let log = log();
        let plain_a = MockSubscriber::new("plain_a", false, &log);
        let computed = MockSubscriber::new("computed", true, &log);
        let plain_b = MockSubscriber::new("plain_b", false, &log);

        let dep = Dep::new();
        dep.add(&(plain_a.clone() as Arc<dyn Subscriber>));
        dep.add(&(computed.clone() as Arc<dyn Subscriber>));
        dep.add(&(plain_b.clone() as Arc<dyn Subscriber>));

        dep.trigger();

        assert_eq!(*log.lock(), vec!["computed", "plain_a", "plain_b"]);
    }

    #[test]
    fn adding_twice_is_a_no_op() {
        let log = log();
        let sub = MockSubscriber::new("a", false, &log);
        let erased: Arc<dyn Subscriber> = sub.clone();

        let dep = Dep::new();
        dep.add(&erased);
        dep.add(&erased);

        assert_eq!(dep.len(), 1);
        assert_eq!(*sub.deps.lock(), 1);

        dep.trigger();
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = log();
        let kept = MockSubscriber::new("kept", false, &log);
        let dropped = MockSubscriber::new("dropped", false, &log);

        let dep = Dep::new();
        dep.add(&(kept.clone() as Arc<dyn Subscriber>));
        dep.add(&(dropped.clone() as Arc<dyn Subscriber>));
        drop(dropped);

        assert_eq!(dep.len(), 2);
        dep.trigger();

        assert_eq!(*log.lock(), vec!["kept"]);
        assert_eq!(dep.len(), 1);
    }

    #[test]
    fn track_without_context_is_a_no_op() {
        let dep = Dep::new();
        dep.track();
        assert!(dep.is_empty());
    }

    #[test]
    fn track_subscribes_the_active_subscriber() {
        let log = log();
        let sub = MockSubscriber::new("a", false, &log);
        let dep = Dep::new();

        {
            let _ctx = ReactiveContext::enter(sub.clone());
            dep.track();
        }

        assert!(dep.contains(sub.id));
    }

    #[test]
    fn running_subscriber_is_not_notified() {
        let log = log();
        let running = MockSubscriber::new("running", false, &log);
        let other = MockSubscriber::new("other", false, &log);

        let dep = Dep::new();
        dep.add(&(running.clone() as Arc<dyn Subscriber>));
        dep.add(&(other.clone() as Arc<dyn Subscriber>));

        {
            let _ctx = ReactiveContext::enter(running.clone());
            dep.trigger();
        }

        assert_eq!(*log.lock(), vec!["other"]);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let log = log();
        let a = MockSubscriber::new("a", false, &log);
        let b = MockSubscriber::new("b", false, &log);
        let c = MockSubscriber::new("c", false, &log);

        let dep = Dep::new();
        for sub in [&a, &b, &c] {
            dep.add(&(Arc::clone(sub) as Arc<dyn Subscriber>));
        }
        dep.remove(a.id);
        dep.trigger();

        assert_eq!(*log.lock(), vec!["b", "c"]);
    }
}
