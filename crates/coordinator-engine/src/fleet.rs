//! Worker records and the fleet manager.
//!
//! The manager owns the pool of worker records, drives launch policies,
//! probes scheduler state, recycles long-running workers before their wall
//! time expires, and tears the pool down. All scheduler traffic goes through
//! the [`Scheduler`] capability; nothing here spawns subprocesses directly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng as _;
use tracing::{debug, info, warn};

use crate::api::FleetError;
use crate::scheduler::{Scheduler, SubmitParams};

const TAG_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TAG_LEN: usize = 6;

/// Attempts granted to the confirm-running loop.
const CONFIRM_ATTEMPTS: usize = 20;
/// Delay between confirm-running probes.
const CONFIRM_INTERVAL: Duration = Duration::from_secs(1);
/// Adaptive launch stops submitting once this many workers sit in the queue.
const ADAPTIVE_PENDING_LIMIT: usize = 2;

/// Normalized lifecycle state of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Never handed to the scheduler.
    Unsubmitted,
    /// Parameters recorded, submission deferred by the adaptive policy.
    ToSubmit,
    /// Waiting in the scheduler queue.
    Pending,
    /// Running on a node.
    Running,
    /// Finished and leaving the queue.
    Completing,
    /// Killed by the scheduler's wall-time limit.
    Timeout,
    /// Reported by the scheduler in a state this coordinator does not track.
    Unknown,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            WorkerState::Unsubmitted => "U",
            WorkerState::ToSubmit => "TS",
            WorkerState::Pending => "PD",
            WorkerState::Running => "R",
            WorkerState::Completing => "CG",
            WorkerState::Timeout => "TO",
            WorkerState::Unknown => "?",
        };
        f.write_str(code)
    }
}

/// Per-worker states, ordered by creation index.
pub type FleetStatus = Vec<WorkerState>;

/// State of one remote worker across submissions.
///
/// Submission parameters are private and survive restarts; a recycled worker
/// is resubmitted with exactly the parameters it was created with.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    local_id: String,
    submission_id: Option<String>,
    state: WorkerState,
    params: SubmitParams,
    elapsed_minutes: f64,
    submission_count: u32,
}

impl WorkerRecord {
    /// Six-character tag unique within this coordinator process.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Scheduler submission id, if currently submitted.
    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// Last known lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Submission parameters this worker was created with.
    pub fn submission_params(&self) -> &SubmitParams {
        &self.params
    }

    /// Elapsed run time from the most recent probe.
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_minutes
    }

    /// How many times this worker has been handed to the scheduler.
    pub fn submission_count(&self) -> u32 {
        self.submission_count
    }
}

/// Resource request shared by every worker of a fleet.
#[derive(Debug, Clone)]
pub struct Resources {
    /// Cores per worker.
    pub cores: u32,
    /// Memory per worker in gigabytes.
    pub memory_gb: u32,
    /// Wall time per worker in minutes.
    pub wall_time_minutes: f64,
    /// Partition or queue for submission.
    pub queue: String,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cores: 48,
            memory_gb: 60,
            wall_time_minutes: 30.0,
            queue: "normal".to_string(),
        }
    }
}

/// Fleet-wide configuration.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Worker name prefix; job names are `<name><local_id>`.
    pub name: String,
    /// The worker executable invocation.
    pub command: String,
    /// Directory for worker stdout/stderr logs.
    pub log_dir: PathBuf,
    /// Directory submission scripts are written to (and cleaned from).
    pub script_dir: PathBuf,
    /// Resource request for every worker.
    pub resources: Resources,
    /// Pause between consecutive submissions, protecting the scheduler CLI.
    pub inter_submission_delay: Duration,
}

impl FleetConfig {
    /// Default pause between consecutive submissions.
    pub const DEFAULT_INTER_SUBMISSION_DELAY: Duration = Duration::from_millis(500);

    /// Configuration with conventional defaults for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            name: "worker-".to_string(),
            command: command.into(),
            log_dir: PathBuf::from("."),
            script_dir: PathBuf::from("."),
            resources: Resources::default(),
            inter_submission_delay: Self::DEFAULT_INTER_SUBMISSION_DELAY,
        }
    }
}

/// How `launch` behaves on a contended cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPolicy {
    /// Submit everything sequentially and take what the queue gives.
    Quiet,
    /// Re-submit batches until the requested count is actually running,
    /// abandoning stragglers to their scheduler timeouts.
    BusyRetry,
    /// Stop submitting once the queue backs up; park the rest as `ToSubmit`.
    Adaptive,
}

/// Owner of the worker pool.
pub struct FleetManager<S> {
    sched: S,
    cfg: FleetConfig,
    records: Vec<WorkerRecord>,
    used_ids: HashSet<String>,
}

impl<S: Scheduler> FleetManager<S> {
    /// Wall-time fraction at which `restart` recycles by default.
    pub const DEFAULT_RESTART_FRACTION: f64 = 0.75;

    /// Manager with no workers yet.
    pub fn new(sched: S, cfg: FleetConfig) -> Self {
        Self {
            sched,
            cfg,
            records: Vec::new(),
            used_ids: HashSet::new(),
        }
    }

    /// The worker records, ordered by creation index.
    pub fn records(&self) -> &[WorkerRecord] {
        &self.records
    }

    /// The underlying scheduler adapter.
    pub fn scheduler(&self) -> &S {
        &self.sched
    }

    /// Current per-worker states without probing.
    pub fn status(&self) -> FleetStatus {
        self.records.iter().map(|r| r.state).collect()
    }

    fn new_record(&mut self) -> WorkerRecord {
        let local_id = loop {
            let tag = random_tag();
            if self.used_ids.insert(tag.clone()) {
                break tag;
            }
        };
        let job_name = format!("{}{}", self.cfg.name, local_id);
        let params = SubmitParams {
            cores: self.cfg.resources.cores,
            memory_gb: self.cfg.resources.memory_gb,
            wall_time_minutes: self.cfg.resources.wall_time_minutes,
            queue: self.cfg.resources.queue.clone(),
            stdout_path: self.cfg.log_dir.join(format!("{job_name}_out.log")),
            stderr_path: self.cfg.log_dir.join(format!("{job_name}_err.log")),
            job_name,
        };
        WorkerRecord {
            local_id,
            submission_id: None,
            state: WorkerState::Unsubmitted,
            params,
            elapsed_minutes: 0.0,
            submission_count: 0,
        }
    }

    async fn submit_idx(&mut self, idx: usize) -> Result<(), FleetError> {
        let script = {
            let rec = &self.records[idx];
            self.sched
                .render_script(&self.cfg.command, &rec.local_id, &rec.params)
        };
        let submission_id = self
            .sched
            .submit(&script, &self.records[idx].params)
            .await?;

        let rec = &mut self.records[idx];
        rec.submission_id = Some(submission_id);
        rec.state = WorkerState::Pending;
        rec.submission_count += 1;

        tokio::time::sleep(self.cfg.inter_submission_delay).await;
        Ok(())
    }

    /// Launch `n_workers` fresh workers under the given policy.
    ///
    /// With `confirm_running`, up to 20 one-second probe rounds are spent
    /// waiting for every worker to reach `Running`; probe failures are fatal
    /// there, soft everywhere else.
    pub async fn launch(
        &mut self,
        n_workers: usize,
        policy: LaunchPolicy,
        confirm_running: bool,
    ) -> Result<FleetStatus, FleetError> {
        info!(n_workers, ?policy, "launching workers");
        match policy {
            LaunchPolicy::Quiet => self.launch_quiet(n_workers, confirm_running).await,
            LaunchPolicy::BusyRetry => self.launch_busy(n_workers).await,
            LaunchPolicy::Adaptive => self.launch_adaptive(n_workers).await,
        }
    }

    async fn launch_quiet(
        &mut self,
        n_workers: usize,
        confirm_running: bool,
    ) -> Result<FleetStatus, FleetError> {
        for _ in 0..n_workers {
            let rec = self.new_record();
            self.records.push(rec);
            self.submit_idx(self.records.len() - 1).await?;
        }

        if confirm_running {
            for _ in 0..CONFIRM_ATTEMPTS {
                let status = self.poll().await?;
                let running = status
                    .iter()
                    .filter(|s| **s == WorkerState::Running)
                    .count();
                if running >= n_workers {
                    break;
                }
                tokio::time::sleep(CONFIRM_INTERVAL).await;
            }
        } else {
            self.poll_soft().await?;
        }
        Ok(self.status())
    }

    async fn launch_busy(&mut self, n_workers: usize) -> Result<FleetStatus, FleetError> {
        let mut accepted: HashSet<String> = HashSet::new();
        while accepted.len() < n_workers {
            let batch_start = self.records.len();
            for _ in 0..(n_workers - accepted.len()) {
                let rec = self.new_record();
                self.records.push(rec);
                self.submit_idx(self.records.len() - 1).await?;
            }

            let entries = self.sched.query().await.map_err(FleetError::from)?;
            for rec in &mut self.records[batch_start..] {
                let running = entries.iter().any(|e| {
                    e.job_name.contains(&rec.local_id) && e.state == WorkerState::Running
                });
                if running {
                    rec.state = WorkerState::Running;
                    accepted.insert(rec.local_id.clone());
                }
            }
            info!(obtained = accepted.len(), wanted = n_workers, "busy-retry round");
        }

        // Stragglers are abandoned, not cancelled; their wall-time limits
        // will reap them. That is the cost of this mode on a full cluster.
        let before = self.records.len();
        self.records.retain(|r| accepted.contains(&r.local_id));
        if before > self.records.len() {
            debug!(abandoned = before - self.records.len(), "left stragglers to the scheduler");
        }
        Ok(self.status())
    }

    async fn launch_adaptive(&mut self, n_workers: usize) -> Result<FleetStatus, FleetError> {
        for _ in 0..n_workers {
            let pending = self
                .records
                .iter()
                .filter(|r| r.state == WorkerState::Pending)
                .count();
            let rec = self.new_record();
            self.records.push(rec);
            let idx = self.records.len() - 1;

            if pending >= ADAPTIVE_PENDING_LIMIT {
                self.records[idx].state = WorkerState::ToSubmit;
                debug!(worker = %self.records[idx].local_id, "queue is backed up; parking worker");
            } else {
                self.submit_idx(idx).await?;
                self.poll_soft().await?;
            }
        }
        self.promote_parked().await
    }

    /// Submit parked (`ToSubmit`) workers while the queue is moving.
    ///
    /// A probe precedes the decision; nothing is submitted while two or more
    /// workers are still pending.
    pub async fn promote_parked(&mut self) -> Result<FleetStatus, FleetError> {
        if !self.records.iter().any(|r| r.state == WorkerState::ToSubmit) {
            return Ok(self.status());
        }
        let status = self.poll_soft().await?;
        let pending = status
            .iter()
            .filter(|s| **s == WorkerState::Pending)
            .count();
        if pending >= ADAPTIVE_PENDING_LIMIT {
            return Ok(status);
        }
        for idx in 0..self.records.len() {
            if self.records[idx].state == WorkerState::ToSubmit {
                self.submit_idx(idx).await?;
            }
        }
        self.poll_soft().await
    }

    /// Probe the scheduler once and fold the listing into every record.
    ///
    /// A record missing from the listing keeps its story consistent: a
    /// previously running worker is taken to be completing, a parked worker
    /// stays parked, anything else keeps its stale state. A record that was
    /// never submitted has no business being probed.
    pub async fn poll(&mut self) -> Result<FleetStatus, FleetError> {
        if self.records.is_empty() {
            return Err(FleetError::Empty);
        }
        let entries = self.sched.query().await?;
        for rec in &mut self.records {
            match entries.iter().find(|e| e.job_name.contains(&rec.local_id)) {
                Some(entry) => {
                    rec.state = entry.state;
                    rec.elapsed_minutes = entry.elapsed_minutes;
                }
                None => match rec.state {
                    WorkerState::Running => rec.state = WorkerState::Completing,
                    WorkerState::ToSubmit => {}
                    WorkerState::Unsubmitted => {
                        return Err(FleetError::Inconsistent(rec.local_id.clone()));
                    }
                    _ => {}
                },
            }
        }
        Ok(self.status())
    }

    /// Like [`poll`](Self::poll), but a failed probe degrades to the stale
    /// status instead of an error. Inconsistent records still fail.
    pub async fn poll_soft(&mut self) -> Result<FleetStatus, FleetError> {
        match self.poll().await {
            Ok(status) => Ok(status),
            Err(FleetError::Scheduler(err)) => {
                warn!(%err, "status probe failed; keeping stale state");
                Ok(self.status())
            }
            Err(other) => Err(other),
        }
    }

    /// Recycle running workers before the scheduler kills them.
    ///
    /// With `by_time`, only workers past `fraction` of their wall time are
    /// recycled; otherwise every running worker is. Each recycled worker is
    /// cancelled and resubmitted with its saved parameters.
    pub async fn restart(&mut self, by_time: bool, fraction: f64) -> Result<FleetStatus, FleetError> {
        // Elapsed times go stale fast; always probe before deciding.
        self.poll().await?;

        for idx in 0..self.records.len() {
            let due = {
                let rec = &self.records[idx];
                rec.state == WorkerState::Running
                    && (!by_time || {
                        let wall = rec.params.wall_time_minutes;
                        wall > 0.0 && rec.elapsed_minutes / wall >= fraction
                    })
            };
            if !due {
                continue;
            }
            if let Some(id) = self.records[idx].submission_id.take() {
                if let Err(err) = self.sched.cancel(&id).await {
                    warn!(%err, worker = %self.records[idx].local_id, "cancel failed during restart");
                }
            }
            info!(worker = %self.records[idx].local_id, "recycling worker");
            self.submit_idx(idx).await?;
        }
        self.poll_soft().await
    }

    /// Cancel every submitted worker and optionally remove the files it left
    /// behind. Best-effort and idempotent; parked workers are skipped and
    /// cancel failures are logged and ignored.
    pub async fn shutdown(&mut self, clean_files: bool) {
        for idx in 0..self.records.len() {
            if self.records[idx].state == WorkerState::ToSubmit {
                continue;
            }
            let Some(id) = self.records[idx].submission_id.take() else {
                continue;
            };
            if let Err(err) = self.sched.cancel(&id).await {
                warn!(%err, worker = %self.records[idx].local_id, "cancel failed during teardown");
            }
            if clean_files {
                self.remove_worker_files(idx);
            }
            self.records[idx].state = WorkerState::Unsubmitted;
        }
    }

    /// Remove script, node-name, and log files carrying this worker's tag.
    fn remove_worker_files(&self, idx: usize) {
        let local_id = self.records[idx].local_id.as_str();
        let mut dirs: Vec<&Path> = vec![Path::new(".")];
        for dir in [self.cfg.script_dir.as_path(), self.cfg.log_dir.as_path()] {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        for dir in dirs {
            let Ok(listing) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in listing.flatten() {
                if entry.file_name().to_string_lossy().contains(local_id) {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
    }
}

fn random_tag() -> String {
    let mut rng = rand::rng();
    (0..TAG_LEN)
        .map(|_| TAG_CHARS[rng.random_range(0..TAG_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubScheduler;

    fn manager(states: Vec<WorkerState>) -> FleetManager<StubScheduler> {
        let mut cfg = FleetConfig::new("/opt/bin/worker --connect tcp://head:5555");
        cfg.inter_submission_delay = Duration::ZERO;
        FleetManager::new(StubScheduler::new(states), cfg)
    }

    #[tokio::test]
    async fn quiet_launch_submits_sequentially() {
        let mut fleet = manager(vec![WorkerState::Pending]);
        let status = fleet
            .launch(3, LaunchPolicy::Quiet, false)
            .await
            .unwrap();
        assert_eq!(status, vec![WorkerState::Pending; 3]);
        assert_eq!(fleet.scheduler().submitted().len(), 3);
        for rec in fleet.records() {
            assert!(rec.submission_id().is_some());
            assert_eq!(rec.submission_count(), 1);
            assert!(rec.submission_params().job_name.contains(rec.local_id()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_confirm_waits_for_running() {
        let mut fleet = manager(vec![WorkerState::Pending, WorkerState::Running]);
        let status = fleet.launch(2, LaunchPolicy::Quiet, true).await.unwrap();
        assert_eq!(status, vec![WorkerState::Running; 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_confirm_gives_up_eventually() {
        let mut fleet = manager(vec![WorkerState::Pending]);
        let status = fleet.launch(1, LaunchPolicy::Quiet, true).await.unwrap();
        assert_eq!(status, vec![WorkerState::Pending]);
    }

    #[tokio::test]
    async fn busy_retry_tops_up_until_running() {
        // First probe round reports the queue stuck, second reports running.
        let mut fleet = manager(vec![WorkerState::Pending, WorkerState::Running]);
        let status = fleet.launch(3, LaunchPolicy::BusyRetry, false).await.unwrap();
        assert_eq!(status, vec![WorkerState::Running; 3]);
        assert_eq!(fleet.records().len(), 3);
        // Six submissions total; the first batch was abandoned, not cancelled.
        assert_eq!(fleet.scheduler().submitted().len(), 6);
        assert!(fleet.scheduler().cancelled().is_empty());
    }

    #[tokio::test]
    async fn adaptive_launch_parks_once_queue_backs_up() {
        let mut fleet = manager(vec![WorkerState::Pending]);
        let status = fleet.launch(5, LaunchPolicy::Adaptive, false).await.unwrap();

        assert_eq!(
            status,
            vec![
                WorkerState::Pending,
                WorkerState::Pending,
                WorkerState::ToSubmit,
                WorkerState::ToSubmit,
                WorkerState::ToSubmit,
            ]
        );
        assert_eq!(fleet.scheduler().submitted().len(), 2);
        // Parked workers have parameters but no submission.
        for rec in &fleet.records()[2..] {
            assert!(rec.submission_id().is_none());
            assert_eq!(rec.submission_count(), 0);
        }
    }

    #[tokio::test]
    async fn parked_workers_are_promoted_when_queue_drains() {
        let mut fleet = manager(vec![WorkerState::Pending]);
        fleet.launch(4, LaunchPolicy::Adaptive, false).await.unwrap();
        assert_eq!(fleet.scheduler().submitted().len(), 2);

        // Queue drained: everything now reports running.
        fleet.scheduler().set_states(vec![WorkerState::Running]);
        let status = fleet.promote_parked().await.unwrap();
        assert_eq!(fleet.scheduler().submitted().len(), 4);
        assert_eq!(status, vec![WorkerState::Running; 4]);
    }

    #[tokio::test]
    async fn poll_reinterprets_missing_records() {
        let mut fleet = manager(vec![WorkerState::Running]);
        fleet.launch(2, LaunchPolicy::Quiet, false).await.unwrap();
        assert_eq!(fleet.status(), vec![WorkerState::Running; 2]);

        // Workers vanish from the listing: running becomes completing.
        fleet.scheduler().clear_live();
        let status = fleet.poll_soft().await.unwrap();
        assert_eq!(status, vec![WorkerState::Completing; 2]);
    }

    #[tokio::test]
    async fn failed_probe_degrades_to_stale_status() {
        let mut fleet = manager(vec![WorkerState::Running]);
        fleet.launch(2, LaunchPolicy::Quiet, false).await.unwrap();
        assert_eq!(fleet.status(), vec![WorkerState::Running; 2]);

        fleet.scheduler().set_query_error(true);
        assert!(matches!(
            fleet.poll().await,
            Err(FleetError::Scheduler(_))
        ));
        let status = fleet.poll_soft().await.unwrap();
        assert_eq!(status, vec![WorkerState::Running; 2]);
    }

    #[tokio::test]
    async fn probing_an_unsubmitted_record_is_fatal() {
        let mut fleet = manager(vec![WorkerState::Running]);
        fleet.launch(1, LaunchPolicy::Quiet, false).await.unwrap();
        let rogue = fleet.new_record();
        fleet.records.push(rogue);
        assert!(matches!(
            fleet.poll().await,
            Err(FleetError::Inconsistent(_))
        ));
    }

    #[tokio::test]
    async fn empty_fleet_cannot_be_probed() {
        let mut fleet = manager(vec![WorkerState::Running]);
        assert!(matches!(fleet.poll().await, Err(FleetError::Empty)));
    }

    #[tokio::test]
    async fn restart_recycles_workers_past_their_wall_time() {
        let mut fleet = manager(vec![WorkerState::Running]);
        fleet.cfg.resources.wall_time_minutes = 30.0;
        fleet.scheduler().set_elapsed(25.0);
        fleet.launch(2, LaunchPolicy::Quiet, false).await.unwrap();
        let old_ids: Vec<String> = fleet
            .records()
            .iter()
            .map(|r| r.submission_id().unwrap().to_string())
            .collect();

        fleet
            .restart(true, FleetManager::<StubScheduler>::DEFAULT_RESTART_FRACTION)
            .await
            .unwrap();

        assert_eq!(fleet.scheduler().cancelled(), old_ids);
        for rec in fleet.records() {
            assert_eq!(rec.submission_count(), 2);
            assert!(!old_ids.contains(&rec.submission_id().unwrap().to_string()));
        }
    }

    #[tokio::test]
    async fn restart_below_threshold_is_a_no_op() {
        let mut fleet = manager(vec![WorkerState::Running]);
        fleet.cfg.resources.wall_time_minutes = 30.0;
        fleet.scheduler().set_elapsed(5.0);
        fleet.launch(1, LaunchPolicy::Quiet, false).await.unwrap();

        fleet.restart(true, 0.75).await.unwrap();
        assert!(fleet.scheduler().cancelled().is_empty());
        assert_eq!(fleet.records()[0].submission_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_skips_parked_workers() {
        let mut fleet = manager(vec![WorkerState::Pending]);
        fleet.launch(5, LaunchPolicy::Adaptive, false).await.unwrap();

        fleet.shutdown(false).await;
        assert_eq!(fleet.scheduler().cancelled().len(), 2);
        for rec in &fleet.records()[..2] {
            assert!(rec.submission_id().is_none());
            assert_eq!(rec.state(), WorkerState::Unsubmitted);
        }
        for rec in &fleet.records()[2..] {
            assert_eq!(rec.state(), WorkerState::ToSubmit);
        }

        fleet.shutdown(false).await;
        assert_eq!(fleet.scheduler().cancelled().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_removes_files_carrying_the_worker_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = FleetConfig::new("worker");
        cfg.inter_submission_delay = Duration::ZERO;
        cfg.script_dir = dir.path().to_path_buf();
        cfg.log_dir = dir.path().to_path_buf();
        let mut fleet = FleetManager::new(
            StubScheduler::new(vec![WorkerState::Running]),
            cfg,
        );
        fleet.launch(1, LaunchPolicy::Quiet, false).await.unwrap();

        let id = fleet.records()[0].local_id().to_string();
        let script = dir.path().join(format!("worker-{id}.sh"));
        let node = dir.path().join(format!("{id}-node.txt"));
        let unrelated = dir.path().join("keep.txt");
        for path in [&script, &node, &unrelated] {
            std::fs::write(path, "x").unwrap();
        }

        fleet.shutdown(true).await;
        assert!(!script.exists());
        assert!(!node.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn tags_are_unique_and_well_formed() {
        let mut fleet = manager(vec![WorkerState::Running]);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let rec = fleet.new_record();
            assert_eq!(rec.local_id().len(), TAG_LEN);
            assert!(rec
                .local_id()
                .bytes()
                .all(|b| TAG_CHARS.contains(&b)));
            assert!(seen.insert(rec.local_id().to_string()));
        }
    }
}
