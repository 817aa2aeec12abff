//! Remote-shell adapter: workers started over plain ssh, no batch system.
//!
//! This variant has no status channel. `query` always fails with
//! `ProbeUnsupported`; callers assume a submission succeeded once the
//! startup grace period has passed, and teardown kills by process name.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::api::SchedulerError;
use crate::scheduler::{QueueEntry, Scheduler, SubmitParams};

/// Scheduler adapter spawning workers over a non-interactive remote shell.
#[derive(Debug)]
pub struct SshScheduler {
    hosts: Vec<String>,
    command: String,
    startup_grace: Duration,
    cursor: AtomicUsize,
}

impl SshScheduler {
    /// Seconds a freshly spawned worker is given to start.
    pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_secs(1);

    /// Adapter assigning submissions to `hosts` round-robin.
    ///
    /// `command` is the worker invocation; it is also the pattern teardown
    /// kills by, so it must match the running process.
    pub fn new(hosts: Vec<String>, command: impl Into<String>) -> Self {
        Self {
            hosts,
            command: command.into(),
            startup_grace: Self::DEFAULT_STARTUP_GRACE,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Override the startup grace period.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    fn next_host(&self) -> Result<&str, SchedulerError> {
        if self.hosts.is_empty() {
            return Err(SchedulerError::Submission("no ssh hosts configured".to_string()));
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        Ok(&self.hosts[idx])
    }
}

impl Scheduler for SshScheduler {
    fn render_script(&self, command: &str, _local_id: &str, _params: &SubmitParams) -> String {
        command.to_string()
    }

    async fn submit(
        &self,
        script_body: &str,
        params: &SubmitParams,
    ) -> Result<String, SchedulerError> {
        let host = self.next_host()?.to_string();
        let remote = format!("sh -c '{}'", script_body.trim());
        let out = Command::new("ssh")
            .args(["-n", "-f", &host, &remote])
            .output()
            .await?;
        if !out.status.success() {
            return Err(SchedulerError::Submission(format!(
                "ssh to {host} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        debug!(job = %params.job_name, %host, "worker spawned");

        // No status channel; give the worker time to come up instead.
        tokio::time::sleep(self.startup_grace).await;
        Ok(host)
    }

    async fn query(&self) -> Result<Vec<QueueEntry>, SchedulerError> {
        Err(SchedulerError::ProbeUnsupported)
    }

    async fn cancel(&self, submission_id: &str) -> Result<(), SchedulerError> {
        let kill = format!("sh -c 'pkill -f \"{}\"'", self.command);
        let out = Command::new("ssh")
            .args(["-n", "-f", submission_id, &kill])
            .output()
            .await?;
        if !out.status.success() {
            // pkill exits nonzero when nothing matched; the worker is gone.
            warn!(host = %submission_id, "remote kill matched no process");
        }
        Ok(())
    }
}

/// Expand a host list by a per-host worker multiplier.
///
/// `expand_hosts(&["a", "b"], &[2, 1])` yields `["a", "a", "b"]`. Counts
/// shorter than the host list default to one worker per remaining host.
pub fn expand_hosts(hosts: &[String], workers_per_host: &[usize]) -> Vec<String> {
    hosts
        .iter()
        .enumerate()
        .flat_map(|(i, host)| {
            let n = workers_per_host.get(i).copied().unwrap_or(1);
            std::iter::repeat_n(host.clone(), n)
        })
        .collect()
}
