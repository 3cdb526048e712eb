//! Registry of cleanup jobs run at shutdown.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

/// Handle returned by [`ShutdownJobs::add_job`].
///
/// Handles are allocated from a counter starting at 0 that only ever
/// increments, so a handle is never reused even after its job is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type JobFn = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

/// A registered job, taken out of the registry when shutdown starts.
pub struct Job {
    pub id: JobId,
    pub name: String,
    callback: JobFn,
}

impl Job {
    /// Consume the job, producing the future that performs the cleanup.
    pub fn into_future(self) -> BoxFuture<'static, bool> {
        (self.callback)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    jobs: BTreeMap<JobId, Job>,
    drained: bool,
}

/// Cleanup jobs keyed by [`JobId`].
///
/// Jobs can be added and removed freely until [`ShutdownJobs::drain`] is
/// called. Jobs added after that are accepted but never run.
#[derive(Default)]
pub struct ShutdownJobs {
    inner: Mutex<Registry>,
}

impl ShutdownJobs {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an async cleanup callback. Returns its handle.
    ///
    /// The callback resolves to `true` on success. Without a `name`, or with
    /// a blank one, the job is called `"Untitled job <id>"`.
    pub fn add_job<F, Fut>(&self, callback: F, name: Option<&str>) -> JobId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let callback: JobFn = Box::new(move || -> BoxFuture<'static, bool> { Box::pin(callback()) });

        let mut registry = self.lock();
        let id = JobId(registry.next_id);
        registry.next_id += 1;

        let name = match name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("Untitled job {}", id),
        };
        if registry.drained {
            warn!(job = %name, "cleanup job added after shutdown started; it will not run");
        } else {
            debug!(job = %name, id = id.0, "cleanup job registered");
        }
        registry.jobs.insert(id, Job { id, name, callback });
        id
    }

    /// Register a synchronous cleanup callback.
    pub fn add_sync_job<F>(&self, callback: F, name: Option<&str>) -> JobId
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.add_job(move || async move { callback() }, name)
    }

    /// Remove a job. Unknown handles are ignored.
    pub fn remove_job(&self, id: JobId) {
        if let Some(job) = self.lock().jobs.remove(&id) {
            debug!(job = %job.name, id = id.0, "cleanup job removed");
        }
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.lock().jobs.contains_key(&id)
    }

    /// Name of a registered job.
    pub fn name_of(&self, id: JobId) -> Option<String> {
        self.lock().jobs.get(&id).map(|j| j.name.clone())
    }

    /// Job names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.lock().jobs.values().map(|j| j.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Take every registered job, in registration order.
    ///
    /// Marks the registry as drained; later additions are kept but never
    /// handed out again.
    pub fn drain(&self) -> Vec<Job> {
        let mut registry = self.lock();
        if registry.drained {
            return Vec::new();
        }
        registry.drained = true;
        std::mem::take(&mut registry.jobs).into_values().collect()
    }
}

impl fmt::Debug for ShutdownJobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownJobs")
            .field("jobs", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_ids_strictly_increase_from_zero() {
        let jobs = ShutdownJobs::new();
        let a = jobs.add_sync_job(|| true, None);
        let b = jobs.add_sync_job(|| true, None);
        jobs.remove_job(b);
        let c = jobs.add_sync_job(|| true, None);

        assert_eq!(a.as_u64(), 0);
        assert_eq!(b.as_u64(), 1);
        assert_eq!(c.as_u64(), 2);
    }

    #[test]
    fn test_default_name() {
        let jobs = ShutdownJobs::new();
        let first = jobs.add_sync_job(|| true, None);
        let named = jobs.add_sync_job(|| true, Some("flush cache"));
        let second = jobs.add_sync_job(|| true, None);

        assert_eq!(jobs.name_of(first).as_deref(), Some("Untitled job 0"));
        assert_eq!(jobs.name_of(named).as_deref(), Some("flush cache"));
        assert_eq!(jobs.name_of(second).as_deref(), Some("Untitled job 2"));
    }

    #[test]
    fn test_blank_name_gets_default() {
        let jobs = ShutdownJobs::new();
        let empty = jobs.add_job(|| async { true }, Some(""));
        let spaces = jobs.add_sync_job(|| true, Some("  "));

        assert_eq!(jobs.name_of(empty).as_deref(), Some("Untitled job 0"));
        assert_eq!(jobs.name_of(spaces).as_deref(), Some("Untitled job 1"));
    }

    #[test]
    fn test_remove_job() {
        let jobs = ShutdownJobs::new();
        let id = jobs.add_sync_job(|| true, Some("close db"));

        jobs.remove_job(id);
        assert!(!jobs.contains(id));
        assert!(jobs.name_of(id).is_none());
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let jobs = ShutdownJobs::new();
        let id = jobs.add_sync_job(|| true, None);
        jobs.remove_job(id);
        jobs.remove_job(id);
        jobs.remove_job(JobId(42));
        assert_eq!(jobs.len(), 0);
    }

    #[test]
    fn test_drain_in_registration_order() {
        let jobs = ShutdownJobs::new();
        for name in ["first", "second", "third"] {
            jobs.add_sync_job(|| true, Some(name));
        }

        let drained: Vec<_> = jobs.drain().into_iter().map(|j| j.name).collect();
        assert_eq!(drained, vec!["first", "second", "third"]);
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_drain_only_once() {
        let jobs = ShutdownJobs::new();
        jobs.add_sync_job(|| true, None);
        assert_eq!(jobs.drain().len(), 1);

        jobs.add_sync_job(|| true, Some("late"));
        assert!(jobs.drain().is_empty());
    }

    #[test]
    fn test_callback_not_run_on_registration() {
        let ran = Arc::new(AtomicBool::new(false));
        let jobs = ShutdownJobs::new();
        let flag = Arc::clone(&ran);
        jobs.add_sync_job(
            move || {
                flag.store(true, Ordering::SeqCst);
                true
            },
            None,
        );
        assert!(!ran.load(Ordering::SeqCst));

        let job = jobs.drain().pop().unwrap();
        assert!(tokio_test::block_on(job.into_future()));
        assert!(ran.load(Ordering::SeqCst));
    }
}
