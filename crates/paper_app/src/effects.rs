use std::path::Path;
use std::time::{Duration, Instant};

use paper_core::{Effect, JobId, Msg, Rejection, RetryPolicy, SyncFailure};
use paper_engine::{EngineEvent, EngineHandle, FailureKind, FetchError, PollPlan};
use paper_logging::{paper_debug, paper_info, paper_warn};

/// Executes reducer effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    retry_policy: RetryPolicy,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, retry_policy: RetryPolicy) -> Self {
        Self {
            engine,
            retry_policy,
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartPolling {
                    job_id,
                    generation,
                    initial,
                } => {
                    paper_info!(job: job_id; "StartPolling generation={}", generation);
                    self.engine.start_polling(PollPlan {
                        job_id,
                        generation,
                        initial,
                        retry_policy: self.retry_policy,
                    });
                }
                Effect::CancelPolling { generation } => {
                    paper_info!("CancelPolling generation={}", generation);
                    self.engine.cancel_polling(generation);
                }
            }
        }
    }

    /// Drains every pending engine event that maps onto a reducer message.
    pub fn pending_msgs(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            if let Some(msg) = map_event(event) {
                msgs.push(msg);
            }
        }
        msgs
    }

    /// Blocks until the submission finishes or `timeout` elapses.
    pub fn upload(&self, path: &Path, timeout: Duration) -> Result<JobId, FetchError> {
        self.engine.upload(path);
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.engine.recv_timeout(remaining) {
                Some(EngineEvent::Uploaded { result }) => return result,
                Some(other) => paper_debug!("ignoring {:?} while uploading", other),
                None => {
                    return Err(FetchError {
                        kind: FailureKind::Timeout,
                        message: format!("no upload result after {:?}", timeout),
                    })
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.cancel_all();
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Snapshot {
            job_id,
            generation,
            seq,
            snapshot,
        } => Some(Msg::SnapshotFetched {
            job_id,
            generation,
            seq,
            snapshot,
        }),
        EngineEvent::SyncFailed {
            job_id,
            generation,
            seq,
            error,
        } => Some(Msg::SyncFailed {
            job_id,
            generation,
            seq,
            failure: SyncFailure::new(error.to_string()),
        }),
        EngineEvent::Rejected {
            job_id,
            generation,
            seq,
            error,
        } => {
            let rejection = match error.kind {
                FailureKind::NotFound => Rejection::NotFound,
                FailureKind::ContractViolation(violation) => {
                    Rejection::ContractViolation(violation)
                }
                other => {
                    paper_warn!(job: job_id; "unexpected terminal failure {}", other);
                    return None;
                }
            };
            Some(Msg::FetchRejected {
                job_id,
                generation,
                seq,
                rejection,
            })
        }
        EngineEvent::PollingStopped {
            job_id,
            generation,
            reason,
        } => {
            paper_debug!(job: job_id; "poll loop {} stopped: {:?}", generation, reason);
            Some(Msg::PollingStopped { job_id, generation })
        }
        EngineEvent::Uploaded { result } => {
            paper_debug!("late upload result {:?}", result);
            None
        }
    }
}
