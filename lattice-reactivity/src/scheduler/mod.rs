//! Job Scheduler
//!
//! Reactive updates that should not run synchronously (watch callbacks, or
//! anything a caller wants to batch) are queued as [`Job`]s and run together
//! in one deferred flush.
//!
//! # Algorithm
//!
//! 1. [`queue_job`] appends the job. If no flush is scheduled yet, exactly
//!    one is requested from the flush host and marked as scheduled.
//! 2. The flush clears the "scheduled" mark first, so jobs queued while it
//!    runs get a flush of their own.
//! 3. It deduplicates the pending jobs by identity, keeping first-enqueued
//!    order, and clears the pending list.
//! 4. Each surviving job runs once. A panicking job is logged and reported;
//!    the rest of the batch still runs.
//!
//! The flush host is the stand-in for a microtask queue: by default a
//! thread-local queue drained with [`run_microtasks`], or the current tokio
//! `LocalSet` (see [`FlushMode`](crate::config::FlushMode)).

mod job;
mod microtask;
mod queue;

pub use job::{Job, JobId};
pub use microtask::{pending_microtasks, queue_microtask, run_microtasks};
pub use queue::{configure, config, flush_jobs, is_flush_pending, pending_jobs, queue_job};
