use paper_logging::{paper_debug, paper_info, paper_warn};

use crate::{ContractViolation, JobId, JobSnapshot, JobStatus};

/// Lifecycle position of the tracked job, including the pre-snapshot condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot applied yet (also covers a sync error before the first success).
    AwaitingSnapshot,
    /// `PENDING` or `PROCESSING`.
    Active(JobStatus),
    Completed,
    JobFailed,
    ContractViolation(ContractViolation),
    NotFound,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::AwaitingSnapshot | Phase::Active(_))
    }
}

/// Terminal outcomes reported by the transport rather than carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    ContractViolation(ContractViolation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status moved forward (or the first snapshot arrived).
    Advanced,
    /// Same status as before.
    Unchanged,
    /// A later snapshot reported an earlier-looking status; adopted anyway.
    Regressed,
    /// A terminal phase was reached with this observation.
    Terminal,
    /// The job was already terminal; the observation was discarded.
    Ignored,
}

/// Maps a snapshot to the phase it represents.
pub fn classify(snapshot: &JobSnapshot) -> Phase {
    if let Err(violation) = snapshot.check_contract() {
        return Phase::ContractViolation(violation);
    }
    match snapshot.status {
        JobStatus::Pending | JobStatus::Processing => Phase::Active(snapshot.status),
        JobStatus::Completed => Phase::Completed,
        JobStatus::Failed => Phase::JobFailed,
    }
}

/// Tracks one job identifier through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMachine {
    job_id: JobId,
    phase: Phase,
}

impl StatusMachine {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            phase: Phase::AwaitingSnapshot,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn observe(&mut self, snapshot: &JobSnapshot) -> Transition {
        if snapshot.job_id != self.job_id {
            paper_warn!(
                job: self.job_id;
                "ignoring snapshot for foreign job {}",
                snapshot.job_id
            );
            return Transition::Ignored;
        }
        if self.phase.is_terminal() {
            paper_debug!(job: self.job_id; "already terminal, ignoring {}", snapshot.status);
            return Transition::Ignored;
        }

        let next = classify(snapshot);
        let transition = match (&self.phase, &next) {
            (_, next) if next.is_terminal() => Transition::Terminal,
            (Phase::Active(previous), Phase::Active(current)) if previous == current => {
                Transition::Unchanged
            }
            (Phase::Active(previous), Phase::Active(current))
                if current.rank() < previous.rank() =>
            {
                paper_warn!(
                    job: self.job_id;
                    "unexpected status regression {} -> {}",
                    previous,
                    current
                );
                Transition::Regressed
            }
            _ => Transition::Advanced,
        };

        match &next {
            Phase::ContractViolation(violation) => {
                paper_warn!(job: self.job_id; "contract violation: {}", violation);
            }
            phase if phase.is_terminal() => {
                paper_info!(job: self.job_id; "terminal status {}", snapshot.status);
            }
            _ => {}
        }
        self.phase = next;
        transition
    }

    pub fn reject(&mut self, rejection: Rejection) -> Transition {
        if self.phase.is_terminal() {
            return Transition::Ignored;
        }
        self.phase = match rejection {
            Rejection::NotFound => {
                paper_info!(job: self.job_id; "job not found");
                Phase::NotFound
            }
            Rejection::ContractViolation(violation) => {
                paper_warn!(job: self.job_id; "contract violation: {}", violation);
                Phase::ContractViolation(violation)
            }
        };
        Transition::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisResult, SectionKey};

    fn analysis() -> AnalysisResult {
        AnalysisResult::new(
            "Title",
            SectionKey::ALL.iter().map(|key| (*key, "body".to_string())),
        )
        .unwrap()
    }

    fn snapshot(status: JobStatus, with_result: bool) -> JobSnapshot {
        JobSnapshot {
            job_id: JobId::from("42"),
            source_name: "paper.pdf".into(),
            status,
            result: with_result.then(analysis),
        }
    }

    #[test]
    fn classify_selects_phase_per_status() {
        assert_eq!(
            classify(&snapshot(JobStatus::Pending, false)),
            Phase::Active(JobStatus::Pending)
        );
        assert_eq!(
            classify(&snapshot(JobStatus::Processing, false)),
            Phase::Active(JobStatus::Processing)
        );
        assert_eq!(classify(&snapshot(JobStatus::Completed, true)), Phase::Completed);
        assert_eq!(classify(&snapshot(JobStatus::Failed, false)), Phase::JobFailed);
        assert_eq!(
            classify(&snapshot(JobStatus::Completed, false)),
            Phase::ContractViolation(ContractViolation::MissingResult)
        );
    }

    #[test]
    fn expected_path_advances_then_terminates() {
        let mut machine = StatusMachine::new(JobId::from("42"));
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Pending, false)),
            Transition::Advanced
        );
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Pending, false)),
            Transition::Unchanged
        );
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Processing, false)),
            Transition::Advanced
        );
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Completed, true)),
            Transition::Terminal
        );
        assert_eq!(machine.phase(), &Phase::Completed);
    }

    #[test]
    fn regression_is_adopted_not_fatal() {
        let mut machine = StatusMachine::new(JobId::from("42"));
        machine.observe(&snapshot(JobStatus::Processing, false));
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Pending, false)),
            Transition::Regressed
        );
        assert_eq!(machine.phase(), &Phase::Active(JobStatus::Pending));
    }

    #[test]
    fn terminal_phase_is_sticky() {
        let mut machine = StatusMachine::new(JobId::from("42"));
        machine.observe(&snapshot(JobStatus::Failed, false));
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Processing, false)),
            Transition::Ignored
        );
        assert_eq!(machine.reject(Rejection::NotFound), Transition::Ignored);
        assert_eq!(machine.phase(), &Phase::JobFailed);
    }

    #[test]
    fn foreign_snapshots_are_ignored() {
        let mut machine = StatusMachine::new(JobId::from("1"));
        assert_eq!(
            machine.observe(&snapshot(JobStatus::Pending, false)),
            Transition::Ignored
        );
        assert_eq!(machine.phase(), &Phase::AwaitingSnapshot);
    }
}
