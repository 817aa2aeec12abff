//! The dispatch engine: one REP endpoint, one chunk per work request,
//! exactly-once aggregation of results.
//!
//! The loop is single-task with one suspension point, the socket receive.
//! REQ/REP serializes each peer's traffic, and message kind is decided by
//! content (a `result` field marks a result submission), so anonymous
//! workers can multiplex freely on the one endpoint.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};
use zeromq::{RepSocket, Socket as _};

use chunkforge_core::payload::Payload;
use chunkforge_core::protocol;

use crate::aggregate::{AggregationMode, Aggregator, RunOutput};
use crate::api::DispatchError;
use crate::codec::PayloadLink;

/// How long the post-drain loop waits for stragglers before giving up.
/// Workers that never ask again are the fleet teardown's problem.
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dispatching,
    Draining,
    Done,
}

/// Configuration of one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Declared length of the chunk stream.
    pub total_chunks: usize,
    /// How results fold into the final output.
    pub mode: AggregationMode,
    /// After the drain, keep answering this many further work requests with
    /// stop packets so known workers exit cleanly. Zero skips the courtesy.
    pub stop_announcements: usize,
}

/// The coordinator side of the chunk protocol.
pub struct DispatchEngine {
    link: PayloadLink<RepSocket>,
    endpoint: String,
}

impl DispatchEngine {
    /// Bind the REP endpoint. `tcp://host:0` picks an ephemeral port; the
    /// resolved address is available from [`endpoint`](Self::endpoint).
    pub async fn bind(addr: &str) -> Result<Self, DispatchError> {
        let mut socket = RepSocket::new();
        let endpoint = socket.bind(addr).await?;
        let endpoint = endpoint.to_string();
        info!(%endpoint, "dispatch endpoint bound");
        Ok(Self {
            link: PayloadLink::new(socket),
            endpoint,
        })
    }

    /// The resolved bound address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Hand out every chunk exactly once, aggregate every result exactly
    /// once, and return the final output.
    ///
    /// `chunks` must yield at least `cfg.total_chunks` items; it is consumed
    /// lazily, one item per work request, and never buffered.
    pub async fn run(
        &mut self,
        mut chunks: impl Iterator<Item = Payload>,
        cfg: &DispatchConfig,
    ) -> Result<RunOutput, DispatchError> {
        let total = cfg.total_chunks;
        let mut agg = Aggregator::new(&cfg.mode, total);
        let mut next_index = 0usize;
        let mut remaining = total;
        let mut outstanding: HashSet<usize> = HashSet::new();
        let mut completed: HashSet<usize> = HashSet::new();
        let mut stops_sent = 0usize;
        let mut phase = Phase::Dispatching;

        info!(total, "dispatch loop started");
        while phase != Phase::Done {
            if phase == Phase::Dispatching && next_index == total {
                debug!("all chunks handed out; draining");
                phase = Phase::Draining;
            }
            if phase == Phase::Draining && remaining == 0 {
                phase = Phase::Done;
                continue;
            }

            let msg = self.link.recv().await?;

            if protocol::is_result(&msg) {
                let raw = protocol::chunk_index(&msg).ok_or_else(|| {
                    DispatchError::Protocol(
                        "result submission carries no chunk index".to_string(),
                    )
                })?;
                match usize::try_from(raw).ok().filter(|i| *i < total) {
                    Some(index) if outstanding.remove(&index) => {
                        agg.absorb(index, &msg)?;
                        completed.insert(index);
                        remaining -= 1;
                        debug!(chunk = index, remaining, "result stored");
                    }
                    Some(index) if completed.contains(&index) => {
                        // A restarted worker may resubmit; aggregation stays
                        // exactly-once.
                        debug!(chunk = index, "duplicate result discarded");
                    }
                    _ => warn!(chunk = raw, "result for unknown chunk discarded"),
                }
                self.link.send(&protocol::ack()).await?;
            } else if protocol::is_work_request(&msg) {
                if next_index < total {
                    let mut chunk = chunks.next().ok_or_else(|| {
                        DispatchError::Protocol(format!(
                            "chunk stream ended at {next_index} of {total} declared chunks"
                        ))
                    })?;
                    protocol::stamp_chunk_index(&mut chunk, next_index as i64);
                    self.link.send(&chunk).await?;
                    outstanding.insert(next_index);
                    next_index += 1;
                } else {
                    self.link.send(&protocol::stop_packet()).await?;
                    stops_sent += 1;
                }
            } else {
                return Err(DispatchError::Protocol(
                    "message is neither a work request nor a result submission".to_string(),
                ));
            }
        }

        // Keep telling known workers to stop; they may be mid-compute on a
        // chunk someone else already returned, or already dead.
        while stops_sent < cfg.stop_announcements {
            let msg = match tokio::time::timeout(STOP_DRAIN_TIMEOUT, self.link.recv()).await {
                Ok(recv) => recv?,
                Err(_) => {
                    debug!(stops_sent, "no more stragglers; leaving the rest to teardown");
                    break;
                }
            };
            if protocol::is_result(&msg) {
                debug!("late result discarded after drain");
                self.link.send(&protocol::ack()).await?;
            } else if protocol::is_work_request(&msg) {
                self.link.send(&protocol::stop_packet()).await?;
                stops_sent += 1;
            } else {
                return Err(DispatchError::Protocol(
                    "message is neither a work request nor a result submission".to_string(),
                ));
            }
        }

        info!(chunks = total, "dispatch complete");
        agg.finish()
    }
}
