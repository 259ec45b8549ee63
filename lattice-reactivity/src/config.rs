//! Runtime configuration.
//!
//! Configuration is per thread, matching the job scheduler it controls. Apply
//! it with [`scheduler::configure`](crate::scheduler::configure).

use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;

/// How the job scheduler requests its deferred flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Queue the flush on the thread-local microtask queue. The host drains
    /// it with [`run_microtasks`](crate::scheduler::run_microtasks) once its
    /// current synchronous work is done.
    #[default]
    Microtask,

    /// Spawn the flush onto the current `tokio::task::LocalSet`.
    ///
    /// Queueing a job in this mode outside a `LocalSet` panics, as
    /// `tokio::task::spawn_local` does.
    TokioLocal,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where deferred flushes run.
    pub flush_mode: FlushMode,

    /// How many times one job may run before the queue goes idle. A job that
    /// keeps re-queueing itself past this is dropped and reported.
    pub max_job_recursion: usize,
}

impl Config {
    /// Default for [`max_job_recursion`](Self::max_job_recursion).
    pub const DEFAULT_MAX_JOB_RECURSION: usize = 100;

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ReactiveError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_mode: FlushMode::default(),
            max_job_recursion: Self::DEFAULT_MAX_JOB_RECURSION,
        }
    }
}
