#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Dispatch engine and worker-fleet manager for `chunkforge` (chunk
//! distribution over a REQ/REP socket, scheduler-backed worker lifecycle).

/// Public API for the engine crate.
pub mod api;

mod aggregate;
mod codec;
mod coordinator;
mod dispatch;
mod fleet;
mod scheduler;
mod slurm;
mod ssh;

#[cfg(test)]
mod testutil;

pub use api::{
    cancel_user_jobs, decode, encode, expand_hosts, AggregationMode, CodecError, Coordinator,
    CoordinatorConfig, CoordinatorError, DispatchConfig, DispatchEngine, DispatchError,
    FleetConfig, FleetError, FleetManager, FleetStatus, LaunchPolicy, PayloadLink, QueueEntry,
    Resources, RunOutput, Scheduler, SchedulerError, SlurmScheduler, SshScheduler, SubmitParams,
    WorkerRecord, WorkerState,
};
