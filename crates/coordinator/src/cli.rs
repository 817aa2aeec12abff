use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use chunkforge_engine::LaunchPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchedulerKind {
    /// Submit workers through the SLURM CLI.
    Slurm,
    /// Spawn workers over ssh on a fixed host list.
    Ssh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AggregateKind {
    /// Keep every per-chunk `result` and `scale`, ordered by chunk index.
    Collect,
    /// Stream results into one scale-weighted running sum.
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Submit everything sequentially.
    Quiet,
    /// Re-submit batches until the requested count is running.
    Busy,
    /// Stop submitting once the queue backs up.
    Adapt,
}

impl From<PolicyKind> for LaunchPolicy {
    fn from(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Quiet => LaunchPolicy::Quiet,
            PolicyKind::Busy => LaunchPolicy::BusyRetry,
            PolicyKind::Adapt => LaunchPolicy::Adaptive,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "chunkforge", version, about = "Chunk dispatch coordinator for batch clusters")]
pub struct Cli {
    /// Address the dispatch socket binds.
    #[arg(long, env = "CHUNKFORGE_BIND", default_value = "tcp://0.0.0.0:5555")]
    pub bind: String,

    /// Worker executable invocation submitted to every node.
    #[arg(long = "worker-cmd", env = "CHUNKFORGE_WORKER_CMD")]
    pub worker_cmd: String,

    /// Number of chunks in the synthetic stream.
    #[arg(short = 'n', long, default_value_t = 16)]
    pub chunks: usize,

    /// Number of workers to launch.
    #[arg(
        short = 'w',
        long,
        default_value_t = 4,
        value_parser = clap::value_parser!(u16).range(1..=4096)
    )]
    pub workers: u16,

    /// Elements in each chunk's data array.
    #[arg(long, default_value_t = 1_000_000)]
    pub payload_elems: usize,

    /// Which scheduler starts the workers.
    #[arg(long, value_enum, default_value_t = SchedulerKind::Slurm)]
    pub scheduler: SchedulerKind,

    /// Hosts for ssh scheduling, comma separated.
    #[arg(long, env = "CHUNKFORGE_HOSTS", value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Workers per host for ssh scheduling; defaults to one per host.
    #[arg(long, value_delimiter = ',')]
    pub workers_per_host: Vec<usize>,

    /// How per-chunk results fold into the final output.
    #[arg(long, value_enum, default_value_t = AggregateKind::Collect)]
    pub aggregate: AggregateKind,

    /// Launch behavior on a contended cluster.
    #[arg(long, value_enum, default_value_t = PolicyKind::Quiet)]
    pub launch_policy: PolicyKind,

    /// Wait for every worker to report running before dispatching.
    #[arg(long, default_value_t = false)]
    pub confirm_running: bool,

    /// Cores per worker.
    #[arg(long, default_value_t = 48)]
    pub cores: u32,

    /// Memory per worker in gigabytes.
    #[arg(long = "mem", default_value_t = 60)]
    pub memory_gb: u32,

    /// Wall time per worker in minutes.
    #[arg(long = "wall-time", default_value_t = 30.0)]
    pub wall_time_minutes: f64,

    /// Partition or queue for submission.
    #[arg(long, default_value = "normal")]
    pub queue: String,

    /// Worker name prefix; job names are `<name><tag>`.
    #[arg(long, default_value = "worker-")]
    pub name: String,

    /// Directory for worker logs.
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Directory for submission scripts.
    #[arg(long, default_value = ".")]
    pub script_dir: PathBuf,

    /// Seconds between consecutive submissions.
    #[arg(long, default_value_t = 0.5)]
    pub submit_delay: f64,

    /// Cancel all of this user's queue entries before launching.
    #[arg(long, default_value_t = false)]
    pub reap_first: bool,

    /// Keep worker script/log/node files at teardown.
    #[arg(long, default_value_t = false)]
    pub keep_files: bool,
}
