mod chunks;
mod cli;
mod format;
mod shutdown;

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chunkforge_engine::{
    cancel_user_jobs, expand_hosts, AggregationMode, Coordinator, CoordinatorConfig, FleetConfig,
    Resources, Scheduler, SchedulerError, SlurmScheduler, SshScheduler,
};

use crate::chunks::synthetic_chunks;
use crate::cli::{AggregateKind, Cli, SchedulerKind};
use crate::format::summarize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.scheduler {
        SchedulerKind::Slurm => {
            let sched = SlurmScheduler::from_env(&cli.script_dir)?;
            run(cli, sched).await
        }
        SchedulerKind::Ssh => {
            if cli.hosts.is_empty() {
                anyhow::bail!("--hosts is required with --scheduler ssh");
            }
            let hosts = expand_hosts(&cli.hosts, &cli.workers_per_host);
            let sched = SshScheduler::new(hosts, cli.worker_cmd.clone());
            run(cli, sched).await
        }
    }
}

async fn run<S: Scheduler>(cli: Cli, sched: S) -> anyhow::Result<()> {
    let fleet_cfg = FleetConfig {
        name: cli.name.clone(),
        command: cli.worker_cmd.clone(),
        log_dir: cli.log_dir.clone(),
        script_dir: cli.script_dir.clone(),
        resources: Resources {
            cores: cli.cores,
            memory_gb: cli.memory_gb,
            wall_time_minutes: cli.wall_time_minutes,
            queue: cli.queue.clone(),
        },
        inter_submission_delay: Duration::from_secs_f64(cli.submit_delay),
    };
    let coord_cfg = CoordinatorConfig {
        bind_addr: cli.bind.clone(),
        n_workers: cli.workers as usize,
        launch_policy: cli.launch_policy.into(),
        confirm_running: cli.confirm_running,
        clean_files: !cli.keep_files,
    };
    let mut coord = Coordinator::new(sched, fleet_cfg, coord_cfg);

    if cli.reap_first {
        match cancel_user_jobs(coord.fleet().scheduler(), None).await {
            Ok(reaped) => info!(reaped, "cleared old queue entries"),
            Err(SchedulerError::ProbeUnsupported) => {
                warn!("this scheduler cannot list jobs; skipping --reap-first")
            }
            Err(SchedulerError::Probe(_)) => info!("queue is already empty"),
            Err(err) => return Err(err.into()),
        }
    }

    let endpoint = coord.bind().await?.to_string();
    info!(%endpoint, workers = cli.workers, chunks = cli.chunks, "coordinator ready");
    coord.launch().await?;

    let mode = match cli.aggregate {
        AggregateKind::Collect => AggregationMode::Collect {
            keys: vec!["result".to_string(), "scale".to_string()],
        },
        AggregateKind::Sum => AggregationMode::Sum {
            scalar_key: "scale".to_string(),
            array_key: "result".to_string(),
            array_len: cli.payload_elems,
        },
    };
    let stream = synthetic_chunks(cli.chunks, cli.payload_elems);

    let mut interrupt = shutdown::spawn_ctrl_c_handler();
    let outcome = tokio::select! {
        res = coord.dispatch(stream, cli.chunks, mode) => Some(res),
        _ = interrupt.recv() => None,
    };

    coord.shutdown().await;

    match outcome {
        Some(Ok(out)) => {
            println!("{}", serde_json::to_string_pretty(&summarize(&out))?);
            Ok(())
        }
        Some(Err(err)) => Err(err.into()),
        None => anyhow::bail!("interrupted before the stream drained"),
    }
}
