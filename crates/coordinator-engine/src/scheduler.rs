//! The scheduler capability: submit, query, cancel.
//!
//! Fleet management talks to the host batch system only through this trait,
//! keeping subprocess plumbing out of the lifecycle logic. Two concrete
//! adapters exist: [`crate::slurm::SlurmScheduler`] for a batch scheduler
//! and [`crate::ssh::SshScheduler`] for a plain remote shell.

use std::path::PathBuf;

use tracing::info;

use crate::api::SchedulerError;
use crate::fleet::WorkerState;

/// Resource and bookkeeping parameters for one submission.
#[derive(Debug, Clone)]
pub struct SubmitParams {
    /// Cores requested for the worker.
    pub cores: u32,
    /// Memory in gigabytes.
    pub memory_gb: u32,
    /// Wall time in (possibly fractional) minutes.
    pub wall_time_minutes: f64,
    /// Partition or queue name.
    pub queue: String,
    /// Scheduler-visible job name.
    pub job_name: String,
    /// Worker stdout log path.
    pub stdout_path: PathBuf,
    /// Worker stderr log path.
    pub stderr_path: PathBuf,
}

/// One row of a queue listing, normalized.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Opaque submission identifier.
    pub submission_id: String,
    /// Scheduler-visible job name.
    pub job_name: String,
    /// Normalized job state.
    pub state: WorkerState,
    /// Elapsed run time in fractional minutes.
    pub elapsed_minutes: f64,
}

/// A batch-system capability.
#[allow(async_fn_in_trait)]
pub trait Scheduler {
    /// Render the submission script for one worker.
    ///
    /// `command` is the worker invocation; `local_id` is the worker's local
    /// tag, available for node-name capture files and the like.
    fn render_script(&self, command: &str, local_id: &str, params: &SubmitParams) -> String;

    /// Submit `script_body`, returning the scheduler's submission id.
    async fn submit(
        &self,
        script_body: &str,
        params: &SubmitParams,
    ) -> Result<String, SchedulerError>;

    /// List the current user's queue entries.
    async fn query(&self) -> Result<Vec<QueueEntry>, SchedulerError>;

    /// Cancel a submission. Idempotent on already-gone jobs.
    async fn cancel(&self, submission_id: &str) -> Result<(), SchedulerError>;
}

/// Cancel every queue entry of the current user, optionally filtered by
/// state. Returns the number of cancellations issued.
pub async fn cancel_user_jobs<S: Scheduler>(
    sched: &S,
    state: Option<WorkerState>,
) -> Result<usize, SchedulerError> {
    let entries = sched.query().await?;
    let mut cancelled = 0;
    for entry in entries {
        if state.is_some_and(|wanted| wanted != entry.state) {
            continue;
        }
        sched.cancel(&entry.submission_id).await?;
        cancelled += 1;
    }
    info!(cancelled, "reaped queue entries");
    Ok(cancelled)
}
