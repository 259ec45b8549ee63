//! Schedulable jobs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a job. Clones of a [`Job`] share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Generate a new unique job ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A callback queued on the scheduler.
///
/// Queueing the same job (or a clone of it) several times before a flush
/// runs it once.
#[derive(Clone)]
pub struct Job {
    id: JobId,
    run: Arc<dyn Fn() + Send + Sync>,
}

impl Job {
    /// Wrap a callback as a job with a fresh identity.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: JobId::new(),
            run: Arc::new(run),
        }
    }

    /// Get the job's identity.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Run the callback now.
    pub fn run(&self) {
        (self.run)();
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn clones_share_identity() {
        let job = Job::new(|| {});
        let clone = job.clone();
        assert_eq!(job.id(), clone.id());
        assert_ne!(job.id(), Job::new(|| {}).id());
    }

    #[test]
    fn run_invokes_the_callback() {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let job = Job::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        job.run();
        job.run();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
