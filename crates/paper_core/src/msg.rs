use crate::{JobId, JobSnapshot, Rejection, SectionKey, SyncFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Start (or re-subscribe to) tracking a job, optionally hydrated with
    /// a snapshot obtained before polling starts.
    TrackJob {
        job_id: JobId,
        initial: Option<JobSnapshot>,
    },
    /// Scheduler published a freshly fetched snapshot.
    SnapshotFetched {
        job_id: JobId,
        generation: u64,
        seq: u64,
        snapshot: JobSnapshot,
    },
    /// Transient transport failure; status is unchanged.
    SyncFailed {
        job_id: JobId,
        generation: u64,
        seq: u64,
        failure: SyncFailure,
    },
    /// Terminal failure reported by the transport (not found, bad payload).
    FetchRejected {
        job_id: JobId,
        generation: u64,
        seq: u64,
        rejection: Rejection,
    },
    /// User toggled one section of a completed job.
    SectionToggled(SectionKey),
    /// User asked to expand every section.
    ExpandAll,
    /// User asked to collapse every section.
    CollapseAll,
    /// Consumer is going away; cancel everything.
    StopTracking,
    /// Scheduler loop for `generation` exited, whatever the reason.
    PollingStopped { job_id: JobId, generation: u64 },
    /// UI/render tick to coalesce rendering.
    Tick,
}
