use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use paper_core::JobId;
use paper_logging::{paper_error, paper_info};
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;

use crate::poller::{run_poll_loop, ChannelEventSink, EventSink, PollPlan, StopReason};
use crate::{EngineEvent, PaperClient};

enum EngineCommand {
    StartPolling(PollPlan),
    CancelPolling { generation: u64 },
    CancelAll,
    Upload { path: PathBuf },
}

/// Jobs whose poll loop ended with a final outcome, remembered so polling
/// never restarts for them. Oldest entries are forgotten past `capacity`.
struct FinishedJobs {
    jobs: VecDeque<JobId>,
    capacity: usize,
}

impl FinishedJobs {
    const CAPACITY: usize = 256;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity,
        }
    }

    fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.contains(job_id)
    }

    fn insert(&mut self, job_id: JobId) {
        if self.contains(&job_id) {
            return;
        }
        if self.jobs.len() == self.capacity {
            self.jobs.pop_front();
        }
        self.jobs.push_back(job_id);
    }
}

struct Finished {
    job_id: JobId,
    generation: u64,
    reason: StopReason,
}

/// Owns a single-threaded tokio runtime that runs poll loops and uploads.
///
/// Commands go in through [`EngineHandle`] methods; results come back as
/// [`EngineEvent`]s. Dropping the handle shuts the runtime down, cancelling
/// every pending timer and in-flight request.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(client: Arc<dyn PaperClient>) -> Self {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    paper_error!("failed to build engine runtime: {}", err);
                    return;
                }
            };
            runtime.block_on(command_loop(client, cmd_rx, event_tx));
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start_polling(&self, plan: PollPlan) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling(plan));
    }

    pub fn cancel_polling(&self, generation: u64) {
        let _ = self.cmd_tx.send(EngineCommand::CancelPolling { generation });
    }

    pub fn cancel_all(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CancelAll);
    }

    pub fn upload(&self, path: impl Into<PathBuf>) {
        let _ = self.cmd_tx.send(EngineCommand::Upload { path: path.into() });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn command_loop(
    client: Arc<dyn PaperClient>,
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
    let (done_tx, mut done_rx) = async_mpsc::unbounded_channel::<Finished>();
    let mut active: HashMap<u64, CancellationToken> = HashMap::new();
    let mut finished_jobs = FinishedJobs::with_capacity(FinishedJobs::CAPACITY);

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                let Some(command) = command else { break };
                handle_command(command, &client, &sink, &done_tx, &mut active, &finished_jobs);
            }
            Some(done) = done_rx.recv() => {
                active.remove(&done.generation);
                if done.reason != StopReason::Cancelled {
                    finished_jobs.insert(done.job_id.clone());
                }
                sink.emit(EngineEvent::PollingStopped {
                    job_id: done.job_id,
                    generation: done.generation,
                    reason: done.reason,
                });
            }
        }
    }

    paper_info!("engine shutting down, cancelling {} poll loop(s)", active.len());
    for (_, token) in active.drain() {
        token.cancel();
    }
}

fn handle_command(
    command: EngineCommand,
    client: &Arc<dyn PaperClient>,
    sink: &Arc<dyn EventSink>,
    done_tx: &async_mpsc::UnboundedSender<Finished>,
    active: &mut HashMap<u64, CancellationToken>,
    finished_jobs: &FinishedJobs,
) {
    match command {
        EngineCommand::StartPolling(plan) => {
            if finished_jobs.contains(&plan.job_id) {
                paper_info!(job: plan.job_id; "already terminal, not restarting polling");
                sink.emit(EngineEvent::PollingStopped {
                    job_id: plan.job_id,
                    generation: plan.generation,
                    reason: StopReason::Terminal,
                });
                return;
            }
            // One poll loop at a time: a new session supersedes any other.
            for (_, token) in active.drain() {
                token.cancel();
            }
            let token = CancellationToken::new();
            active.insert(plan.generation, token.clone());

            let client = client.clone();
            let sink = sink.clone();
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                let job_id = plan.job_id.clone();
                let generation = plan.generation;
                let reason = run_poll_loop(client.as_ref(), plan, sink.as_ref(), token).await;
                let _ = done_tx.send(Finished {
                    job_id,
                    generation,
                    reason,
                });
            });
        }
        EngineCommand::CancelPolling { generation } => {
            if let Some(token) = active.remove(&generation) {
                token.cancel();
            }
        }
        EngineCommand::CancelAll => {
            for (_, token) in active.drain() {
                token.cancel();
            }
        }
        EngineCommand::Upload { path } => {
            let client = client.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                let result = client.upload(&path).await;
                sink.emit(EngineEvent::Uploaded { result });
            });
        }
    }
}
