use crate::{JobId, JobSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Arm the scheduler for `job_id`. Every event it publishes must carry `generation`.
    /// `initial` (already applied to state) decides the first delay.
    StartPolling {
        job_id: JobId,
        generation: u64,
        initial: Option<JobSnapshot>,
    },
    /// Cancel the scheduler armed for `generation`, including any in-flight fetch.
    CancelPolling { generation: u64 },
}
