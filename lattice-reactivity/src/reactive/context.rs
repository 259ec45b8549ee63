//! Reactive Context
//!
//! The reactive context tracks which effect is currently running. This
//! enables automatic dependency tracking: when a key is read, the running
//! effect is subscribed to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an effect pushes it; the guard
//! returned by [`ReactiveContext::enter`] pops it, so the previous effect is
//! restored after nested runs and after a panic unwinds through `run`.
//!
//! An entry may also be empty: [`untracked`] pushes one so that reads inside
//! it subscribe nothing, even when called from inside an effect.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Arc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Make `subscriber` the active effect until the guard is dropped.
    pub(crate) fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { subscriber_id }
    }

    fn enter_untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self {
            subscriber_id: None,
        }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the active effect's ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|subscriber| subscriber.id()))
        })
    }

    /// Number of entries on this thread's context stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    pub(crate) fn current() -> Option<Arc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.as_ref().map(|subscriber| subscriber.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

/// Run `f` with tracking paused.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::subscriber::mock::MockSubscriber;
    use parking_lot::Mutex;

    fn subscriber(name: &'static str) -> Arc<MockSubscriber> {
        MockSubscriber::new(name, false, &Arc::new(Mutex::new(Vec::new())))
    }

    #[test]
    fn context_tracks_subscriber() {
        let sub = subscriber("a");
        let id = sub.id;

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(sub);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn nested_contexts() {
        let outer = subscriber("outer");
        let inner = subscriber("inner");
        let (id1, id2) = (outer.id, inner.id);

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_hides_the_active_subscriber() {
        let sub = subscriber("a");
        let id = sub.id;
        let _ctx = ReactiveContext::enter(sub);

        untracked(|| {
            assert!(!ReactiveContext::is_active());
            assert!(ReactiveContext::current().is_none());
        });

        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
    }

    #[test]
    fn context_is_restored_after_panic() {
        let sub = subscriber("a");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ReactiveContext::enter(sub);
            panic!("inside effect");
        }));

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
