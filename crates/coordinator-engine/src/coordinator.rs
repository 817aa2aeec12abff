//! Top-level composition: fleet and dispatch engine under one handle.
//!
//! A run is bind → launch → dispatch → shutdown. Fatal dispatch errors
//! still tear the fleet down before surfacing.

use tracing::{error, info};

use chunkforge_core::payload::Payload;

use crate::aggregate::{AggregationMode, RunOutput};
use crate::api::CoordinatorError;
use crate::dispatch::{DispatchConfig, DispatchEngine};
use crate::fleet::{FleetConfig, FleetManager, FleetStatus, LaunchPolicy};
use crate::scheduler::Scheduler;

/// Top-level run configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Address the dispatch endpoint binds, e.g. `tcp://0.0.0.0:5555`.
    pub bind_addr: String,
    /// Number of workers to launch and, at end of stream, to stop.
    pub n_workers: usize,
    /// Launch policy for the fleet.
    pub launch_policy: LaunchPolicy,
    /// Wait for every worker to be running before dispatching.
    pub confirm_running: bool,
    /// Remove worker script/log/node files at teardown.
    pub clean_files: bool,
}

/// The coordinator: a fleet manager plus a dispatch engine.
pub struct Coordinator<S: Scheduler> {
    fleet: FleetManager<S>,
    engine: Option<DispatchEngine>,
    cfg: CoordinatorConfig,
}

impl<S: Scheduler> Coordinator<S> {
    /// Compose a coordinator from its parts. Nothing is bound or launched yet.
    pub fn new(sched: S, fleet_cfg: FleetConfig, cfg: CoordinatorConfig) -> Self {
        Self {
            fleet: FleetManager::new(sched, fleet_cfg),
            engine: None,
            cfg,
        }
    }

    /// Bind the dispatch endpoint, returning the resolved address.
    pub async fn bind(&mut self) -> Result<&str, CoordinatorError> {
        if self.engine.is_none() {
            self.engine = Some(DispatchEngine::bind(&self.cfg.bind_addr).await?);
        }
        Ok(self.endpoint().unwrap_or_default())
    }

    /// The resolved dispatch address, once bound.
    pub fn endpoint(&self) -> Option<&str> {
        self.engine.as_ref().map(DispatchEngine::endpoint)
    }

    /// The fleet manager.
    pub fn fleet(&self) -> &FleetManager<S> {
        &self.fleet
    }

    /// Mutable access to the fleet manager, for probing and restarts
    /// between dispatch runs.
    pub fn fleet_mut(&mut self) -> &mut FleetManager<S> {
        &mut self.fleet
    }

    /// Launch the configured number of workers.
    pub async fn launch(&mut self) -> Result<FleetStatus, CoordinatorError> {
        let status = self
            .fleet
            .launch(self.cfg.n_workers, self.cfg.launch_policy, self.cfg.confirm_running)
            .await?;
        info!(status = %format_status(&status), "fleet launched");
        Ok(status)
    }

    /// Recycle workers close to their wall-time limit. Intended between
    /// dispatch runs; a probe always precedes the decision.
    pub async fn restart_long_runners(&mut self) -> Result<FleetStatus, CoordinatorError> {
        Ok(self
            .fleet
            .restart(true, FleetManager::<S>::DEFAULT_RESTART_FRACTION)
            .await?)
    }

    /// Run one chunk stream to completion and return its aggregate.
    pub async fn dispatch(
        &mut self,
        chunks: impl Iterator<Item = Payload>,
        total_chunks: usize,
        mode: AggregationMode,
    ) -> Result<RunOutput, CoordinatorError> {
        let engine = self.engine.as_mut().ok_or(CoordinatorError::NotBound)?;
        let cfg = DispatchConfig {
            total_chunks,
            mode,
            stop_announcements: self.cfg.n_workers,
        };
        Ok(engine.run(chunks, &cfg).await?)
    }

    /// Tear the fleet down. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.fleet.shutdown(self.cfg.clean_files).await;
    }

    /// Bind, launch, dispatch one stream, and tear down, in that order.
    /// The fleet is torn down whether dispatch succeeds or not.
    pub async fn run_to_completion(
        mut self,
        chunks: impl Iterator<Item = Payload>,
        total_chunks: usize,
        mode: AggregationMode,
    ) -> Result<RunOutput, CoordinatorError> {
        self.bind().await?;
        if let Err(err) = self.launch().await {
            error!(%err, "launch failed; tearing down");
            self.shutdown().await;
            return Err(err);
        }
        let outcome = self.dispatch(chunks, total_chunks, mode).await;
        self.shutdown().await;
        outcome
    }
}

fn format_status(status: &FleetStatus) -> String {
    status
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use chunkforge_core::payload::{PayloadExt, Value};
    use chunkforge_core::protocol;

    use super::*;
    use crate::fleet::WorkerState;
    use crate::testutil::{run_worker, StubScheduler};

    #[tokio::test]
    async fn full_run_launches_dispatches_and_tears_down() {
        let mut fleet_cfg = FleetConfig::new("worker --connect tcp://head:5555");
        fleet_cfg.inter_submission_delay = Duration::ZERO;
        let mut coord = Coordinator::new(
            StubScheduler::new(vec![WorkerState::Running]),
            fleet_cfg,
            CoordinatorConfig {
                bind_addr: "tcp://127.0.0.1:0".to_string(),
                n_workers: 2,
                launch_policy: LaunchPolicy::Quiet,
                confirm_running: false,
                clean_files: false,
            },
        );

        let endpoint = coord.bind().await.unwrap().to_string();
        coord.launch().await.unwrap();
        assert_eq!(coord.fleet().records().len(), 2);

        let mut workers = Vec::new();
        for _ in 0..2 {
            workers.push(tokio::spawn(run_worker(endpoint.clone(), |chunk| {
                let scale = chunk.get_i64("scale").expect("chunk carries scale");
                let index = protocol::chunk_index(chunk).expect("chunk carries index");
                let mut p = chunkforge_core::payload::Payload::new();
                protocol::stamp_chunk_index(&mut p, index);
                p.insert("result".into(), Value::Int(scale * 2));
                p
            })));
        }

        let chunks = (0..4).map(|i| {
            let mut p = chunkforge_core::payload::Payload::new();
            p.insert("scale".into(), Value::Int(i + 1));
            p
        });
        let out = coord
            .dispatch(
                chunks,
                4,
                AggregationMode::Collect {
                    keys: vec!["result".into()],
                },
            )
            .await
            .unwrap();
        for worker in workers {
            worker.await.unwrap();
        }

        coord.shutdown().await;
        assert_eq!(coord.fleet().scheduler().cancelled().len(), 2);
        for rec in coord.fleet().records() {
            assert_eq!(rec.state(), WorkerState::Unsubmitted);
        }

        assert_eq!(
            out,
            RunOutput::Collected(BTreeMap::from([(
                "result".to_string(),
                vec![2, 4, 6, 8].into_iter().map(Value::Int).collect(),
            )]))
        );
    }

    #[tokio::test]
    async fn run_to_completion_composes_the_whole_flow() {
        let mut fleet_cfg = FleetConfig::new("worker");
        fleet_cfg.inter_submission_delay = Duration::ZERO;
        let mut coord = Coordinator::new(
            StubScheduler::new(vec![WorkerState::Running]),
            fleet_cfg,
            CoordinatorConfig {
                bind_addr: "tcp://127.0.0.1:0".to_string(),
                n_workers: 1,
                launch_policy: LaunchPolicy::Quiet,
                confirm_running: false,
                clean_files: false,
            },
        );

        // Bind first so the in-process worker knows where to connect;
        // `run_to_completion` reuses the bound endpoint.
        let endpoint = coord.bind().await.unwrap().to_string();
        let worker = tokio::spawn(run_worker(endpoint, |chunk| {
            let scale = chunk.get_i64("scale").expect("chunk carries scale");
            let index = protocol::chunk_index(chunk).expect("chunk carries index");
            let mut p = chunkforge_core::payload::Payload::new();
            protocol::stamp_chunk_index(&mut p, index);
            p.insert("result".into(), Value::Int(scale * 2));
            p
        }));

        let chunks = (0..3).map(|i| {
            let mut p = chunkforge_core::payload::Payload::new();
            p.insert("scale".into(), Value::Int(i + 1));
            p
        });
        let out = coord
            .run_to_completion(
                chunks,
                3,
                AggregationMode::Collect {
                    keys: vec!["result".into()],
                },
            )
            .await
            .unwrap();
        worker.await.unwrap();

        assert_eq!(
            out,
            RunOutput::Collected(BTreeMap::from([(
                "result".to_string(),
                vec![2, 4, 6].into_iter().map(Value::Int).collect(),
            )]))
        );
    }

    #[tokio::test]
    async fn dispatch_before_bind_is_rejected() {
        let mut fleet_cfg = FleetConfig::new("worker");
        fleet_cfg.inter_submission_delay = Duration::ZERO;
        let mut coord = Coordinator::new(
            StubScheduler::new(vec![WorkerState::Running]),
            fleet_cfg,
            CoordinatorConfig {
                bind_addr: "tcp://127.0.0.1:0".to_string(),
                n_workers: 1,
                launch_policy: LaunchPolicy::Quiet,
                confirm_running: false,
                clean_files: false,
            },
        );
        let err = coord
            .dispatch(
                std::iter::empty(),
                0,
                AggregationMode::Collect { keys: Vec::new() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NotBound));
    }
}
