//! Error types for the reactive runtime.
//!
//! Tracking and triggering never fail. Errors only surface at the edges where
//! user code runs on behalf of the runtime: computed getters, scheduled jobs,
//! and configuration loading.

use thiserror::Error;

use crate::scheduler::JobId;

/// Errors reported by the reactive runtime.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A wrapped computation panicked.
    ///
    /// Returned by [`Computed::try_get`](crate::reactive::Computed::try_get).
    /// The cell is left dirty, so the next read recomputes.
    #[error("computation panicked: {message}")]
    ComputationPanicked {
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A computed value was read by its own getter.
    #[error("computed value was read while it was being computed")]
    CyclicComputed,

    /// A queued job panicked during a flush.
    #[error("job {job} panicked: {message}")]
    JobPanicked {
        /// The job that panicked.
        job: JobId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A job kept re-queueing itself and was dropped.
    #[error("job {job} exceeded the recursion limit of {limit} runs")]
    RecursionLimit {
        /// The job that was dropped.
        job: JobId,
        /// The configured limit.
        limit: usize,
    },

    /// One or more jobs in a flush failed. Every other job still ran.
    #[error("{} job(s) failed during flush ({ran} ran)", .failures.len())]
    JobsFailed {
        /// Number of jobs that completed normally.
        ran: usize,
        /// One [`JobPanicked`](Self::JobPanicked) or
        /// [`RecursionLimit`](Self::RecursionLimit) entry per failed job.
        failures: Vec<ReactiveError>,
    },

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
