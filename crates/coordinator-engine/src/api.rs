//! Public API types for the `chunkforge` engine crate.
//!
//! The error taxonomy lives here; the operational types are re-exported from
//! the implementation modules.

use thiserror::Error;

pub use crate::aggregate::{AggregationMode, RunOutput};
pub use crate::codec::{decode, encode, PayloadLink};
pub use crate::coordinator::{Coordinator, CoordinatorConfig};
pub use crate::dispatch::{DispatchConfig, DispatchEngine};
pub use crate::fleet::{
    FleetConfig, FleetManager, FleetStatus, LaunchPolicy, Resources, WorkerRecord, WorkerState,
};
pub use crate::scheduler::{cancel_user_jobs, QueueEntry, Scheduler, SubmitParams};
pub use crate::slurm::SlurmScheduler;
pub use crate::ssh::{expand_hosts, SshScheduler};

/// A payload failed to encode or decode.
#[derive(Debug, Error)]
pub enum CodecError {
    /// MessagePack serialization failed.
    #[error("payload encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// MessagePack deserialization failed.
    #[error("payload decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    /// The compressor or decompressor failed.
    #[error("payload compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// A scheduler CLI invocation failed.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler refused a submission.
    #[error("job submission failed: {0}")]
    Submission(String),
    /// The queue CLI produced no usable data.
    #[error("queue probe failed: {0}")]
    Probe(String),
    /// This scheduler variant has no status channel.
    #[error("status probing is not supported by this scheduler")]
    ProbeUnsupported,
    /// Spawning or talking to the CLI process failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A fleet-level failure.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The underlying scheduler adapter failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// A record with no submission id was probed while not awaiting
    /// submission. This indicates a bug, not a cluster condition.
    #[error("worker {0} has no submission id and is not awaiting submission")]
    Inconsistent(String),
    /// The fleet holds no records.
    #[error("fleet is empty; launch workers before probing them")]
    Empty,
}

/// A dispatch-loop failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A peer violated the request/reply protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// A payload failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The message socket failed.
    #[error("socket error: {0}")]
    Socket(#[from] zeromq::ZmqError),
}

/// A top-level coordinator failure.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Fleet launch, probe, or restart failed.
    #[error(transparent)]
    Fleet(#[from] FleetError),
    /// The dispatch loop failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// `run` was called before `bind`.
    #[error("dispatch endpoint is not bound")]
    NotBound,
}
