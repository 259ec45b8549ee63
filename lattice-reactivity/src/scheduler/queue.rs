//! The pending-job queue and its flush.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use super::job::{Job, JobId};
use super::microtask::queue_microtask;
use crate::config::{Config, FlushMode};
use crate::error::{panic_message, ReactiveError};

#[derive(Default)]
struct SchedulerState {
    pending: Vec<Job>,
    flush_scheduled: bool,
    config: Config,
    /// Runs per job since the queue was last idle.
    run_counts: HashMap<JobId, usize>,
}

thread_local! {
    static STATE: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Replace this thread's scheduler configuration.
pub fn configure(config: Config) {
    debug!(?config, "configuring scheduler");
    STATE.with(|state| state.borrow_mut().config = config);
}

/// This thread's scheduler configuration.
pub fn config() -> Config {
    STATE.with(|state| state.borrow().config.clone())
}

/// Queue `job` for the next flush, requesting one if none is scheduled.
pub fn queue_job(job: Job) {
    let request = STATE.with(|state| {
        let mut state = state.borrow_mut();
        trace!(job = job.id().raw(), pending = state.pending.len(), "queue job");
        state.pending.push(job);
        if state.flush_scheduled {
            None
        } else {
            state.flush_scheduled = true;
            Some(state.config.flush_mode)
        }
    });

    if let Some(mode) = request {
        request_flush(mode);
    }
}

fn request_flush(mode: FlushMode) {
    match mode {
        FlushMode::Microtask => queue_microtask(deferred_flush),
        FlushMode::TokioLocal => {
            // `spawn_local` panics outside a `LocalSet`
            let spawned = catch_unwind(|| {
                tokio::task::spawn_local(async { deferred_flush() });
            });
            if spawned.is_err() {
                warn!("no tokio LocalSet on this thread, flushing through the microtask queue");
                queue_microtask(deferred_flush);
            }
        }
    }
}

fn deferred_flush() {
    if let Err(err) = flush_jobs() {
        warn!(%err, "deferred flush reported failures");
    }
}

/// Run every pending job once.
///
/// Normally called by the flush host; calling it directly flushes
/// synchronously. Returns the number of jobs that completed, or
/// [`ReactiveError::JobsFailed`] once all jobs have had their turn.
pub fn flush_jobs() -> Result<usize, ReactiveError> {
    let (jobs, limit) = STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.flush_scheduled = false;

        let mut unique: IndexMap<JobId, Job> = IndexMap::with_capacity(state.pending.len());
        for job in state.pending.drain(..) {
            unique.entry(job.id()).or_insert(job);
        }
        (
            unique.into_values().collect::<Vec<_>>(),
            state.config.max_job_recursion,
        )
    });

    if jobs.is_empty() {
        return Ok(0);
    }
    trace!(jobs = jobs.len(), "flushing jobs");

    let mut ran = 0;
    let mut failures = Vec::new();

    for job in jobs {
        let runs = STATE.with(|state| {
            let mut state = state.borrow_mut();
            let runs = state.run_counts.entry(job.id()).or_insert(0);
            *runs += 1;
            *runs
        });

        if runs > limit {
            warn!(job = job.id().raw(), limit, "job exceeded recursion limit, dropping it");
            failures.push(ReactiveError::RecursionLimit {
                job: job.id(),
                limit,
            });
            continue;
        }

        match catch_unwind(AssertUnwindSafe(|| job.run())) {
            Ok(()) => ran += 1,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(job = job.id().raw(), %message, "job panicked");
                failures.push(ReactiveError::JobPanicked {
                    job: job.id(),
                    message,
                });
            }
        }
    }

    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if state.pending.is_empty() {
            state.run_counts.clear();
        }
    });

    debug!(ran, failed = failures.len(), "flush finished");
    if failures.is_empty() {
        Ok(ran)
    } else {
        Err(ReactiveError::JobsFailed { ran, failures })
    }
}

/// Number of jobs waiting for the next flush, duplicates included.
pub fn pending_jobs() -> usize {
    STATE.with(|state| state.borrow().pending.len())
}

/// Check if a flush has been requested and has not started yet.
pub fn is_flush_pending() -> bool {
    STATE.with(|state| state.borrow().flush_scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::run_microtasks;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Arc, OnceLock};

    fn counting_job(count: &Arc<AtomicI32>) -> Job {
        let count = count.clone();
        Job::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn queueing_requests_one_flush() {
        let count = Arc::new(AtomicI32::new(0));
        queue_job(counting_job(&count));
        queue_job(counting_job(&count));

        assert!(is_flush_pending());
        assert_eq!(pending_jobs(), 2);
        assert_eq!(crate::scheduler::pending_microtasks(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert_eq!(run_microtasks(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!is_flush_pending());
    }

    #[test]
    fn duplicate_jobs_run_once() {
        let count = Arc::new(AtomicI32::new(0));
        let job = counting_job(&count);

        queue_job(job.clone());
        queue_job(job.clone());
        queue_job(job);

        assert_eq!(flush_jobs().unwrap(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn jobs_run_in_first_enqueued_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = |name: &'static str| {
            let log = log.clone();
            Job::new(move || log.lock().push(name))
        };
        let a = make("a");
        let b = make("b");
        let c = make("c");

        queue_job(b.clone());
        queue_job(a.clone());
        queue_job(b);
        queue_job(c);
        queue_job(a);

        flush_jobs().unwrap();
        assert_eq!(*log.lock(), vec!["b", "a", "c"]);
    }

    #[test]
    fn job_queued_during_flush_gets_its_own_flush() {
        let count = Arc::new(AtomicI32::new(0));
        let follow_up = counting_job(&count);
        let first = {
            let follow_up = follow_up.clone();
            Job::new(move || queue_job(follow_up.clone()))
        };

        queue_job(first);
        assert_eq!(flush_jobs().unwrap(), 1);

        // The follow-up was not run by the flush that queued it
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(is_flush_pending());
        assert_eq!(pending_jobs(), 1);

        run_microtasks();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(pending_jobs(), 0);
    }

    #[test]
    fn panicking_job_does_not_stop_siblings() {
        let count = Arc::new(AtomicI32::new(0));
        queue_job(Job::new(|| panic!("job failed")));
        queue_job(counting_job(&count));

        match flush_jobs() {
            Err(ReactiveError::JobsFailed { ran, failures }) => {
                assert_eq!(ran, 1);
                assert_eq!(failures.len(), 1);
                assert!(matches!(
                    &failures[0],
                    ReactiveError::JobPanicked { message, .. } if message == "job failed"
                ));
            }
            other => panic!("expected JobsFailed, got {other:?}"),
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(pending_jobs(), 0);
    }

    #[test]
    fn self_requeueing_job_hits_recursion_limit() {
        configure(Config {
            max_job_recursion: 5,
            ..Config::default()
        });

        let count = Arc::new(AtomicI32::new(0));
        let slot: Arc<OnceLock<Job>> = Arc::new(OnceLock::new());
        let job = {
            let count = count.clone();
            let slot = slot.clone();
            Job::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(job) = slot.get() {
                    queue_job(job.clone());
                }
            })
        };
        let _ = slot.set(job.clone());

        queue_job(job);
        run_microtasks();

        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert!(!is_flush_pending());
        assert_eq!(pending_jobs(), 0);
    }

    #[test]
    fn tokio_mode_without_local_set_falls_back_to_microtasks() {
        configure(Config {
            flush_mode: FlushMode::TokioLocal,
            ..Config::default()
        });

        let count = Arc::new(AtomicI32::new(0));
        queue_job(counting_job(&count));

        assert!(is_flush_pending());
        assert_eq!(crate::scheduler::pending_microtasks(), 1);
        run_microtasks();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!is_flush_pending());

        // The queue is still usable after switching back
        configure(Config::default());
        queue_job(counting_job(&count));
        run_microtasks();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!is_flush_pending());
    }

    #[test]
    fn flushing_an_empty_queue_is_a_no_op() {
        assert_eq!(flush_jobs().unwrap(), 0);
    }
}
