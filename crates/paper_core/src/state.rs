use std::collections::{BTreeMap, VecDeque};

use paper_logging::{paper_debug, paper_info, paper_warn};

use crate::view_model::{render, SyncBanner, TrackerViewModel};
use crate::{
    JobId, JobSnapshot, Phase, Rejection, SectionVisibility, StatusMachine, TogglePolicy,
    Transition,
};

/// Terminal outcomes kept after their session is replaced.
const MAX_FINISHED_JOBS: usize = 32;

/// Transport-level failure description, kept separate from job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub message: String,
}

impl SyncFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerConfig {
    pub toggle_policy: TogglePolicy,
    /// Halt polling after this many sync errors in a row; `None` retries forever.
    pub max_consecutive_sync_failures: Option<u32>,
}

/// Per-job tracking session. Replaced, never reused, when the job identifier changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) machine: StatusMachine,
    pub(crate) snapshot: Option<JobSnapshot>,
    /// Highest sequence stamp applied for the current generation (0 = none).
    pub(crate) last_seq: u64,
    pub(crate) consecutive_failures: u32,
    pub(crate) last_failure: Option<SyncFailure>,
    pub(crate) sync_halted: bool,
    pub(crate) polling: bool,
}

impl Session {
    fn new(job_id: JobId) -> Self {
        Self {
            machine: StatusMachine::new(job_id),
            snapshot: None,
            last_seq: 0,
            consecutive_failures: 0,
            last_failure: None,
            sync_halted: false,
            polling: false,
        }
    }
}

/// Terminal phase and last snapshot of a job that is no longer displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FinishedJob {
    machine: StatusMachine,
    snapshot: Option<JobSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerState {
    config: TrackerConfig,
    /// Bumped on every scheduler (re)start or stop; events carrying an older value are stale.
    generation: u64,
    session: Option<Session>,
    /// Visibility per completed job. Holds at most the current job's entry.
    visibility: BTreeMap<JobId, SectionVisibility>,
    /// Most recent first; re-tracking one of these re-hydrates without polling.
    finished: VecDeque<FinishedJob>,
    dirty: bool,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.session.as_ref().map(|session| session.machine.job_id())
    }

    pub fn phase(&self) -> Option<&Phase> {
        self.session.as_ref().map(|session| session.machine.phase())
    }

    pub fn snapshot(&self) -> Option<&JobSnapshot> {
        self.session.as_ref().and_then(|session| session.snapshot.as_ref())
    }

    pub fn visibility(&self) -> Option<&SectionVisibility> {
        self.job_id().and_then(|job_id| self.visibility.get(job_id))
    }

    pub fn is_polling(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.polling)
    }

    pub fn view(&self) -> TrackerViewModel {
        let Some(session) = &self.session else {
            return TrackerViewModel {
                dirty: self.dirty,
                ..TrackerViewModel::default()
            };
        };
        let job_id = session.machine.job_id();
        let body = render(
            session.machine.phase(),
            session.snapshot.as_ref(),
            self.visibility.get(job_id),
        );
        let sync_banner = session.last_failure.as_ref().map(|failure| SyncBanner {
            message: failure.message.clone(),
            consecutive_failures: session.consecutive_failures,
            halted: session.sync_halted,
        });
        TrackerViewModel {
            job_id: Some(job_id.clone()),
            body,
            sync_banner,
            polling: session.polling,
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Tears down the current session and opens a fresh one for `job_id`.
    ///
    /// Returns the generation of a scheduler that must be cancelled, if one was running.
    pub(crate) fn replace_session(&mut self, job_id: JobId) -> Option<u64> {
        let cancelled = self.clear_session();
        self.generation += 1;
        self.session = Some(Session::new(job_id));
        self.dirty = true;
        cancelled
    }

    /// Drops the session and every piece of visibility state.
    pub(crate) fn clear_session(&mut self) -> Option<u64> {
        let previous = self.session.take()?;
        let cancelled = previous.polling.then_some(self.generation);
        self.generation += 1;
        self.visibility.clear();
        if previous.machine.phase().is_terminal() {
            self.finished
                .retain(|job| job.machine.job_id() != previous.machine.job_id());
            self.finished.push_front(FinishedJob {
                machine: previous.machine,
                snapshot: previous.snapshot,
            });
            self.finished.truncate(MAX_FINISHED_JOBS);
        }
        self.dirty = true;
        cancelled
    }

    /// Restores the terminal outcome of the current job if it finished in an
    /// earlier session. Visibility starts over from the all-expanded default.
    pub(crate) fn restore_finished(&mut self) -> bool {
        let toggle_policy = self.config.toggle_policy;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let job_id = session.machine.job_id().clone();
        let Some(index) = self
            .finished
            .iter()
            .position(|job| job.machine.job_id() == &job_id)
        else {
            return false;
        };
        let Some(finished) = self.finished.remove(index) else {
            return false;
        };
        session.machine = finished.machine;
        session.snapshot = finished.snapshot;
        if session.machine.phase() == &Phase::Completed {
            self.visibility.insert(
                job_id.clone(),
                SectionVisibility::all_expanded(job_id, toggle_policy),
            );
        }
        self.dirty = true;
        true
    }

    /// Marks the current session as polling under the current generation.
    pub(crate) fn arm_polling(&mut self) -> Option<u64> {
        let session = self.session.as_mut()?;
        session.polling = true;
        Some(self.generation)
    }

    /// Restarts polling on the same session under a new generation, after a halt.
    pub(crate) fn resume_polling(&mut self) -> Option<u64> {
        let session = self.session.as_mut()?;
        self.generation += 1;
        session.last_seq = 0;
        session.consecutive_failures = 0;
        session.sync_halted = false;
        session.polling = true;
        self.dirty = true;
        Some(self.generation)
    }

    /// Checks an asynchronous completion against the current session and
    /// records its sequence stamp when accepted.
    pub(crate) fn accepts(&mut self, job_id: &JobId, generation: u64, seq: u64) -> bool {
        let current_generation = self.generation;
        let Some(session) = self.session.as_mut() else {
            paper_debug!(job: job_id; "no active session, dropping event");
            return false;
        };
        if generation != current_generation || session.machine.job_id() != job_id {
            paper_warn!(
                job: job_id;
                "dropping stale event (generation {} vs {})",
                generation,
                current_generation
            );
            return false;
        }
        if seq <= session.last_seq {
            paper_warn!(
                job: job_id;
                "dropping out-of-order response seq={} (last applied {})",
                seq,
                session.last_seq
            );
            return false;
        }
        session.last_seq = seq;
        true
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: JobSnapshot) -> Transition {
        let toggle_policy = self.config.toggle_policy;
        let Some(session) = self.session.as_mut() else {
            return Transition::Ignored;
        };
        let transition = session.machine.observe(&snapshot);
        if transition == Transition::Ignored {
            return transition;
        }
        session.consecutive_failures = 0;
        session.last_failure = None;
        session.snapshot = Some(snapshot);
        if transition == Transition::Terminal {
            session.polling = false;
        }
        if session.machine.phase() == &Phase::Completed {
            let job_id = session.machine.job_id().clone();
            self.visibility
                .entry(job_id.clone())
                .or_insert_with(|| SectionVisibility::all_expanded(job_id, toggle_policy));
        }
        self.dirty = true;
        transition
    }

    pub(crate) fn apply_rejection(&mut self, rejection: Rejection) -> Transition {
        let Some(session) = self.session.as_mut() else {
            return Transition::Ignored;
        };
        let transition = session.machine.reject(rejection);
        if transition == Transition::Terminal {
            session.polling = false;
            session.last_failure = None;
            self.dirty = true;
        }
        transition
    }

    /// Records a sync error. Returns true when polling should halt.
    pub(crate) fn record_sync_failure(&mut self, failure: SyncFailure) -> bool {
        let limit = self.config.max_consecutive_sync_failures;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.consecutive_failures = session.consecutive_failures.saturating_add(1);
        paper_warn!(
            job: session.machine.job_id();
            "sync error #{}: {}",
            session.consecutive_failures,
            failure.message
        );
        session.last_failure = Some(failure);
        self.dirty = true;
        let halt = limit.is_some_and(|max| session.consecutive_failures >= max);
        if halt {
            session.sync_halted = true;
            session.polling = false;
            self.generation += 1;
        }
        halt
    }

    /// Handles the scheduler reporting that its loop for `generation` ended.
    ///
    /// Returns true when the loop ended while the session still expected
    /// polling, which leaves the session halted with a banner.
    pub(crate) fn polling_ended(&mut self, job_id: &JobId, generation: u64) -> bool {
        let current_generation = self.generation;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if generation != current_generation
            || session.machine.job_id() != job_id
            || !session.polling
        {
            return false;
        }
        paper_info!(job: job_id; "scheduler stopped before the job settled");
        session.polling = false;
        session.sync_halted = true;
        session.last_failure = Some(SyncFailure::new(
            "polling stopped before the job reached a final state",
        ));
        self.generation += 1;
        self.dirty = true;
        true
    }

    /// Applies `change` to the current job's visibility, if the job is completed.
    pub(crate) fn with_visibility(&mut self, change: impl FnOnce(&mut SectionVisibility)) -> bool {
        let Some(job_id) = self.job_id().cloned() else {
            return false;
        };
        let Some(visibility) = self.visibility.get_mut(&job_id) else {
            return false;
        };
        change(visibility);
        self.dirty = true;
        true
    }
}
