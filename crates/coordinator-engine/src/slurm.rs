//! SLURM adapter: `sbatch` / `squeue` / `scancel` behind the scheduler trait.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, warn};

use chunkforge_core::timefmt;

use crate::api::SchedulerError;
use crate::fleet::WorkerState;
use crate::scheduler::{QueueEntry, Scheduler, SubmitParams};

const SUBMIT_CMD: &str = "sbatch";
const QUEUE_CMD: &str = "squeue";
const CANCEL_CMD: &str = "scancel";

/// Fixed column layout: id, partition, name, user, state, elapsed, nodes, host.
const QUEUE_FORMAT: &str = "%.18i %.9P %.17j %.10u %.2t %.10M %.6D %R";

/// Scheduler adapter for a SLURM cluster.
#[derive(Debug, Clone)]
pub struct SlurmScheduler {
    user: String,
    script_dir: PathBuf,
}

impl SlurmScheduler {
    /// Adapter submitting scripts from `script_dir` and querying jobs of `user`.
    pub fn new(script_dir: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            script_dir: script_dir.into(),
        }
    }

    /// Adapter for the user owning this process (`$USER` / `$LOGNAME`).
    pub fn from_env(script_dir: impl Into<PathBuf>) -> Result<Self, SchedulerError> {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .map_err(|_| SchedulerError::Probe("neither USER nor LOGNAME is set".to_string()))?;
        Ok(Self::new(script_dir, user))
    }

    /// The directory submission scripts are written to.
    pub fn script_dir(&self) -> &std::path::Path {
        &self.script_dir
    }
}

impl Scheduler for SlurmScheduler {
    fn render_script(&self, command: &str, local_id: &str, params: &SubmitParams) -> String {
        format!(
            "#! /bin/bash\n\
             #SBATCH --job-name {job_name}\n\
             #SBATCH --ntasks=1\n\
             #SBATCH --cpus-per-task={cores}\n\
             #SBATCH --mem={mem}gb\n\
             #SBATCH --partition={queue}\n\
             #SBATCH --time={time}\n\
             #SBATCH --output={out}\n\
             #SBATCH --error={err}\n\
             cd $SLURM_SUBMIT_DIR\n\
             echo $SLURMD_NODENAME > {local_id}-node.txt\n\
             {command}\n",
            job_name = params.job_name,
            cores = params.cores,
            mem = params.memory_gb,
            queue = params.queue,
            time = timefmt::format_minutes(params.wall_time_minutes),
            out = params.stdout_path.display(),
            err = params.stderr_path.display(),
        )
    }

    async fn submit(
        &self,
        script_body: &str,
        params: &SubmitParams,
    ) -> Result<String, SchedulerError> {
        let script_path = self.script_dir.join(format!("{}.sh", params.job_name));
        tokio::fs::write(&script_path, script_body).await?;

        let out = Command::new(SUBMIT_CMD).arg(&script_path).output().await?;
        if !out.status.success() {
            return Err(SchedulerError::Submission(format!(
                "{SUBMIT_CMD} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        let submission_id = parse_submission_id(&stdout)?;
        debug!(job = %params.job_name, id = %submission_id, "submitted");
        Ok(submission_id)
    }

    async fn query(&self) -> Result<Vec<QueueEntry>, SchedulerError> {
        let out = Command::new(QUEUE_CMD)
            .args(["-u", &self.user, "-o", QUEUE_FORMAT])
            .output()
            .await?;
        if !out.status.success() {
            return Err(SchedulerError::Probe(format!(
                "{QUEUE_CMD} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_queue_output(&String::from_utf8_lossy(&out.stdout))
    }

    async fn cancel(&self, submission_id: &str) -> Result<(), SchedulerError> {
        let out = Command::new(CANCEL_CMD).arg(submission_id).output().await?;
        if !out.status.success() {
            // Already-gone jobs are expected during teardown.
            warn!(
                id = %submission_id,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "cancel did not succeed"
            );
        }
        Ok(())
    }
}

/// Last whitespace-separated token of the submit CLI's stdout.
fn parse_submission_id(stdout: &str) -> Result<String, SchedulerError> {
    stdout
        .split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| SchedulerError::Submission(format!("{SUBMIT_CMD} produced no output")))
}

/// Parse the fixed-column queue listing, dropping header and trailer rows.
fn parse_queue_output(raw: &str) -> Result<Vec<QueueEntry>, SchedulerError> {
    let mut rows = Vec::new();
    for line in raw.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 6 {
            continue;
        }
        let elapsed_minutes = timefmt::parse_minutes(cols[5])
            .map_err(|err| SchedulerError::Probe(err.to_string()))?;
        rows.push(QueueEntry {
            submission_id: cols[0].to_string(),
            job_name: cols[2].to_string(),
            state: normalize_state(cols[4]),
            elapsed_minutes,
        });
    }
    if rows.is_empty() {
        return Err(SchedulerError::Probe(
            "queue listing contained no data rows".to_string(),
        ));
    }
    Ok(rows)
}

fn normalize_state(code: &str) -> WorkerState {
    match code {
        "R" => WorkerState::Running,
        "PD" => WorkerState::Pending,
        "CG" => WorkerState::Completing,
        "TO" => WorkerState::Timeout,
        _ => WorkerState::Unknown,
    }
}
