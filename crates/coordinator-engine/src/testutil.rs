//! Test doubles: a scripted scheduler and an in-process REQ-socket worker.

use std::collections::VecDeque;
use std::sync::Mutex;

use zeromq::Socket as _;

use chunkforge_core::payload::Payload;
use chunkforge_core::protocol;

use crate::api::SchedulerError;
use crate::codec::PayloadLink;
use crate::fleet::WorkerState;
use crate::scheduler::{QueueEntry, Scheduler, SubmitParams};

/// A scheduler whose queue listing is scripted per call.
///
/// Each `query` consumes the next state from the script and applies it to
/// every live job; the final state repeats. Submissions get ids `stub-1`,
/// `stub-2`, … in order.
pub(crate) struct StubScheduler {
    inner: Mutex<StubInner>,
}

#[derive(Default)]
struct StubInner {
    submitted: Vec<String>,
    cancelled: Vec<String>,
    states: VecDeque<WorkerState>,
    elapsed_minutes: f64,
    fail_queries: bool,
    next_id: u32,
    live: Vec<(String, String)>,
}

impl StubScheduler {
    pub(crate) fn new(states: Vec<WorkerState>) -> Self {
        Self {
            inner: Mutex::new(StubInner {
                states: states.into(),
                ..StubInner::default()
            }),
        }
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub(crate) fn cancelled(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancelled.clone()
    }

    pub(crate) fn set_states(&self, states: Vec<WorkerState>) {
        self.inner.lock().unwrap().states = states.into();
    }

    pub(crate) fn set_elapsed(&self, minutes: f64) {
        self.inner.lock().unwrap().elapsed_minutes = minutes;
    }

    pub(crate) fn set_query_error(&self, fail: bool) {
        self.inner.lock().unwrap().fail_queries = fail;
    }

    pub(crate) fn clear_live(&self) {
        self.inner.lock().unwrap().live.clear();
    }
}

impl Scheduler for StubScheduler {
    fn render_script(&self, command: &str, _local_id: &str, _params: &SubmitParams) -> String {
        command.to_string()
    }

    async fn submit(
        &self,
        _script_body: &str,
        params: &SubmitParams,
    ) -> Result<String, SchedulerError> {
        let mut g = self.inner.lock().unwrap();
        g.next_id += 1;
        let id = format!("stub-{}", g.next_id);
        g.submitted.push(params.job_name.clone());
        g.live.push((id.clone(), params.job_name.clone()));
        Ok(id)
    }

    async fn query(&self) -> Result<Vec<QueueEntry>, SchedulerError> {
        let mut g = self.inner.lock().unwrap();
        if g.fail_queries {
            return Err(SchedulerError::Probe("scripted probe failure".to_string()));
        }
        let state = if g.states.len() > 1 {
            g.states.pop_front().unwrap_or(WorkerState::Running)
        } else {
            g.states.front().copied().unwrap_or(WorkerState::Running)
        };
        let elapsed_minutes = g.elapsed_minutes;
        Ok(g.live
            .iter()
            .map(|(id, name)| QueueEntry {
                submission_id: id.clone(),
                job_name: name.clone(),
                state,
                elapsed_minutes,
            })
            .collect())
    }

    async fn cancel(&self, submission_id: &str) -> Result<(), SchedulerError> {
        let mut g = self.inner.lock().unwrap();
        g.cancelled.push(submission_id.to_string());
        g.live.retain(|(id, _)| id != submission_id);
        Ok(())
    }
}

/// Run a protocol-conforming worker against `endpoint` until it receives a
/// stop packet. `compute` maps each work packet to its result submission.
pub(crate) async fn run_worker<F>(endpoint: String, compute: F)
where
    F: Fn(&Payload) -> Payload + Send + 'static,
{
    let mut socket = zeromq::ReqSocket::new();
    socket.connect(&endpoint).await.expect("worker connect");
    let mut link = PayloadLink::new(socket);

    loop {
        link.send(&protocol::work_request()).await.expect("send request");
        let chunk = link.recv().await.expect("recv work packet");
        if protocol::is_stop(&chunk) {
            break;
        }
        let result = compute(&chunk);
        link.send(&result).await.expect("send result");
        let _ack = link.recv().await.expect("recv ack");
    }
}
