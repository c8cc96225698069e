//! Fetch-and-compare loop for one tracked job.
//!
//! The loop is strictly sequential: at most one fetch or one delay timer is
//! outstanding per job, so responses are published in request order. Every
//! published event carries the session `generation` and a per-fetch `seq`
//! stamp; consumers drop anything older than what they already applied.

use std::sync::mpsc;
use std::time::Duration;

use paper_core::{poll_delay_ms, retry_delay_ms, JobId, JobSnapshot, RetryPolicy};
use paper_logging::{paper_debug, paper_info, paper_warn};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, PaperClient};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// What to poll and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPlan {
    pub job_id: JobId,
    pub generation: u64,
    /// Snapshot already shown to the user; only used to derive the first delay.
    pub initial: Option<JobSnapshot>,
    pub retry_policy: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A terminal status was observed.
    Terminal,
    /// The transport reported a terminal failure (not found, contract breach).
    Rejected,
    /// The cancellation token fired.
    Cancelled,
}

/// Runs the poll loop until a terminal status, a terminal failure, or cancellation.
///
/// Without an initial snapshot the first fetch is issued immediately;
/// otherwise the first fetch waits `poll_delay_ms(initial)`.
pub async fn run_poll_loop(
    client: &dyn PaperClient,
    plan: PollPlan,
    sink: &dyn EventSink,
    cancel: CancellationToken,
) -> StopReason {
    let PollPlan {
        job_id,
        generation,
        initial,
        retry_policy,
    } = plan;

    let mut delay_ms = initial.as_ref().map_or(0, poll_delay_ms);
    if initial.is_some() && delay_ms == 0 {
        paper_info!(job: job_id; "initial snapshot is terminal, nothing to poll");
        return StopReason::Terminal;
    }
    let mut last = initial;
    let mut seq = 0u64;
    let mut consecutive_failures = 0u32;

    paper_info!(job: job_id; "polling started (generation {})", generation);
    loop {
        if delay_ms > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return cancelled(&job_id, generation),
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }
        }

        seq += 1;
        paper_debug!(job: job_id; "fetch seq={} generation={}", seq, generation);
        let result = tokio::select! {
            _ = cancel.cancelled() => return cancelled(&job_id, generation),
            result = client.fetch_snapshot(&job_id) => result,
        };
        if cancel.is_cancelled() {
            return cancelled(&job_id, generation);
        }

        match result {
            Ok(snapshot) => {
                consecutive_failures = 0;
                delay_ms = poll_delay_ms(&snapshot);
                sink.emit(EngineEvent::Snapshot {
                    job_id: job_id.clone(),
                    generation,
                    seq,
                    snapshot: snapshot.clone(),
                });
                if delay_ms == 0 {
                    paper_info!(job: job_id; "terminal status {}, polling stopped", snapshot.status);
                    return StopReason::Terminal;
                }
                last = Some(snapshot);
            }
            Err(error) if error.kind.is_terminal() => {
                paper_warn!(job: job_id; "fetch rejected: {}", error);
                sink.emit(EngineEvent::Rejected {
                    job_id: job_id.clone(),
                    generation,
                    seq,
                    error,
                });
                return StopReason::Rejected;
            }
            Err(error) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                delay_ms = retry_delay_ms(retry_policy, consecutive_failures, last.as_ref());
                paper_warn!(
                    job: job_id;
                    "sync error #{} (retry in {} ms): {}",
                    consecutive_failures,
                    delay_ms,
                    error
                );
                sink.emit(EngineEvent::SyncFailed {
                    job_id: job_id.clone(),
                    generation,
                    seq,
                    error,
                });
            }
        }
    }
}

fn cancelled(job_id: &JobId, generation: u64) -> StopReason {
    paper_info!(job: job_id; "polling cancelled (generation {})", generation);
    StopReason::Cancelled
}
