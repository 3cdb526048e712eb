//! Signal-driven shutdown: run every cleanup job, then exit.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::jobs::{Job, JobId, ShutdownJobs};

/// Delay before exiting with a failure code, so the failure log can flush.
pub const DEFAULT_FAILURE_EXIT_DELAY: Duration = Duration::from_millis(100);

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// Wait between logging a failed shutdown and exiting with code 1.
    pub failure_exit_delay: Duration,
    /// Per-job time limit. `None` (the default) lets a job run as long as
    /// it needs.
    pub job_timeout: Option<Duration>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            failure_exit_delay: DEFAULT_FAILURE_EXIT_DELAY,
            job_timeout: None,
        }
    }
}

/// Why a job counted as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The job resolved to `false`.
    ReturnedFalse,
    /// The job panicked.
    Panicked(String),
    /// The job exceeded the configured time limit.
    TimedOut(Duration),
    /// The job's task was cancelled by the runtime.
    Cancelled,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReturnedFalse => write!(f, "reported failure"),
            Self::Panicked(msg) => write!(f, "panicked: {}", msg),
            Self::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub id: JobId,
    pub name: String,
    pub result: Result<(), JobFailure>,
}

/// Result of running every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownOutcome {
    /// One report per job, in the order the jobs ran.
    pub reports: Vec<JobReport>,
}

impl ShutdownOutcome {
    /// `true` when every job succeeded, including when there were none.
    pub fn success(&self) -> bool {
        self.reports.iter().all(|r| r.result.is_ok())
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| r.result.is_err())
    }
}

/// Terminates the process. Replaced by a recording fake in tests.
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdProcessExit;

impl ProcessExit for StdProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code)
    }
}

/// Runs registered cleanup jobs when the process is asked to terminate.
///
/// Starts in the running state. The first termination request moves it to
/// terminating for good; later requests are ignored. Jobs run one at a
/// time in registration order, every job runs even if an earlier one
/// failed, and the exit code is decided only after the last job finishes.
pub struct ShutdownCoordinator {
    jobs: Arc<ShutdownJobs>,
    config: ShutdownConfig,
    exit: Arc<dyn ProcessExit>,
    terminating: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(jobs: Arc<ShutdownJobs>, config: ShutdownConfig, exit: Arc<dyn ProcessExit>) -> Self {
        Self {
            jobs,
            config,
            exit,
            terminating: AtomicBool::new(false),
        }
    }

    /// Create a coordinator and start listening for termination signals.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// completes only if the exit hook returns, which the real one never
    /// does.
    pub fn install(
        jobs: Arc<ShutdownJobs>,
        config: ShutdownConfig,
        exit: Arc<dyn ProcessExit>,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let coordinator = Arc::new(Self::new(jobs, config, exit));
        let listener = Arc::clone(&coordinator).listen();
        (coordinator, listener)
    }

    /// Spawn the signal listener for this coordinator.
    pub fn listen(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.watch(signal_stream()).await })
    }

    /// Feed the termination requests named by `signals` to [`terminate`].
    ///
    /// The first request starts termination. Requests arriving while the
    /// jobs run are still handed to [`terminate`], which logs and ignores
    /// them. Returns once termination finishes, or right away if the stream
    /// ends before yielding anything.
    ///
    /// [`terminate`]: Self::terminate
    pub async fn watch<S>(&self, mut signals: S)
    where
        S: Stream<Item = &'static str> + Unpin,
    {
        let Some(first) = signals.next().await else {
            return;
        };

        let termination = self.terminate(first);
        tokio::pin!(termination);
        loop {
            tokio::select! {
                _ = &mut termination => return,
                Some(signal) = signals.next() => {
                    self.terminate(signal).await;
                }
            }
        }
    }

    pub fn jobs(&self) -> &Arc<ShutdownJobs> {
        &self.jobs
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Handle a termination request named `signal`.
    ///
    /// Runs every job, logs the outcome and calls the exit hook with 0 or 1.
    /// Returns `None` if termination was already underway.
    pub async fn terminate(&self, signal: &str) -> Option<ShutdownOutcome> {
        if self.terminating.swap(true, Ordering::SeqCst) {
            warn!("shutdown: {} received while already terminating, ignoring", signal);
            return None;
        }

        info!("shutdown: {} received", signal);
        info!("shutdown: running cleanup jobs");
        let outcome = self.run_jobs().await;

        if outcome.success() {
            info!("shutdown: cleanup done");
        } else {
            error!("shutdown: failed to run all cleanup jobs");
            tokio::time::sleep(self.config.failure_exit_delay).await;
        }
        self.exit.exit(outcome.exit_code());
        Some(outcome)
    }

    /// Run every registered job in order and collect the results.
    ///
    /// Does not exit the process.
    pub async fn run_jobs(&self) -> ShutdownOutcome {
        let mut reports = Vec::new();
        for job in self.jobs.drain() {
            let (id, name) = (job.id, job.name.clone());
            let result = self.run_job(job).await;
            match &result {
                Ok(()) => info!("shutdown: cleanup job \"{}\" done", name),
                Err(failure) => error!("shutdown: cleanup job \"{}\" failed ({})", name, failure),
            }
            reports.push(JobReport { id, name, result });
        }
        ShutdownOutcome { reports }
    }

    async fn run_job(&self, job: Job) -> Result<(), JobFailure> {
        // A separate task turns a panicking job into a JoinError.
        let mut handle = tokio::spawn(job.into_future());

        let joined = match self.config.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return Err(JobFailure::TimedOut(limit));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(true) => Ok(()),
            Ok(false) => Err(JobFailure::ReturnedFalse),
            Err(e) if e.is_panic() => Err(JobFailure::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(JobFailure::Cancelled),
        }
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("jobs", &self.jobs)
            .field("config", &self.config)
            .field("terminating", &self.is_terminating())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}

/// Every SIGINT, SIGTERM and SIGQUIT, by name.
#[cfg(unix)]
fn signal_stream() -> BoxStream<'static, &'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    ) {
        (Ok(sigint), Ok(sigterm), Ok(sigquit)) => {
            stream::unfold((sigint, sigterm, sigquit), |mut signals| async move {
                let name = tokio::select! {
                    Some(()) = signals.0.recv() => "SIGINT",
                    Some(()) = signals.1.recv() => "SIGTERM",
                    Some(()) = signals.2.recv() => "SIGQUIT",
                    else => return None,
                };
                Some((name, signals))
            })
            .boxed()
        }
        _ => {
            warn!("shutdown: could not install unix signal handlers, falling back to ctrl-c");
            ctrl_c_stream()
        }
    }
}

#[cfg(not(unix))]
fn signal_stream() -> BoxStream<'static, &'static str> {
    ctrl_c_stream()
}

fn ctrl_c_stream() -> BoxStream<'static, &'static str> {
    stream::unfold((), |()| async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("shutdown: unable to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        Some(("SIGINT", ()))
    })
    .boxed()
}
