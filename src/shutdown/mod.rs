//! Graceful shutdown coordination.
//!
//! Components register cleanup work with [`ShutdownJobs`]. On SIGINT,
//! SIGTERM or SIGQUIT the [`ShutdownCoordinator`] drains the registry, runs
//! each job to completion in registration order, and exits with 0 if every
//! job succeeded or 1 otherwise.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_relay::shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownJobs, StdProcessExit};
//!
//! #[tokio::main]
//! async fn main() {
//!     let jobs = Arc::new(ShutdownJobs::new());
//!     jobs.add_job(|| async { true }, Some("flush metrics"));
//!
//!     let (_coordinator, listener) =
//!         ShutdownCoordinator::install(jobs, ShutdownConfig::default(), Arc::new(StdProcessExit));
//!     let _ = listener.await;
//! }
//! ```

mod coordinator;
mod jobs;

pub use coordinator::{
    JobFailure, JobReport, ProcessExit, ShutdownConfig, ShutdownCoordinator, ShutdownOutcome,
    StdProcessExit, DEFAULT_FAILURE_EXIT_DELAY,
};
pub use jobs::{Job, JobId, ShutdownJobs};
