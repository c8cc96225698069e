//! Paper insight core: pure job-tracking state machine and view-model helpers.
mod effect;
mod lifecycle;
mod msg;
mod polling;
mod snapshot;
mod state;
mod update;
mod view_model;
mod visibility;

pub use effect::Effect;
pub use lifecycle::{classify, Phase, Rejection, StatusMachine, Transition};
pub use msg::Msg;
pub use polling::{poll_delay_ms, retry_delay_ms, RetryPolicy, POLL_INTERVAL_MS};
pub use snapshot::{AnalysisResult, ContractViolation, JobId, JobSnapshot, JobStatus, SectionKey};
pub use state::{SyncFailure, TrackerConfig, TrackerState};
pub use update::update;
pub use view_model::{render, ResultView, SectionView, SectionsView, SyncBanner, TrackerViewModel};
pub use visibility::{SectionVisibility, TogglePolicy};
