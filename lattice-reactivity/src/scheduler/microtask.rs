//! Thread-local microtask queue.
//!
//! The default flush host. Callbacks queued here run when the owner of the
//! thread's event loop calls [`run_microtasks`], after its current
//! synchronous work has unwound.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Queue `task` to run on the next [`run_microtasks`] call on this thread.
pub fn queue_microtask<F>(task: F)
where
    F: FnOnce() + 'static,
{
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run queued microtasks until the queue is empty.
///
/// Microtasks queued by a running microtask run in the same call. Returns
/// how many ran.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        match next {
            Some(task) => {
                task();
                ran += 1;
            }
            None => break,
        }
    }
    if ran > 0 {
        trace!(ran, "drained microtasks");
    }
    ran
}

/// Number of microtasks waiting on this thread.
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}
