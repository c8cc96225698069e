use paper_logging::{paper_debug, paper_info, paper_warn};

use crate::{Effect, JobId, JobSnapshot, Msg, TrackerState, Transition};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    let effects = match msg {
        Msg::TrackJob { job_id, initial } => track_job(&mut state, job_id, initial),
        Msg::SnapshotFetched {
            job_id,
            generation,
            seq,
            snapshot,
        } => {
            if !state.accepts(&job_id, generation, seq) {
                return (state, Vec::new());
            }
            let transition = state.apply_snapshot(snapshot);
            cancel_if_terminal(&state, transition)
        }
        Msg::SyncFailed {
            job_id,
            generation,
            seq,
            failure,
        } => {
            if !state.accepts(&job_id, generation, seq) {
                return (state, Vec::new());
            }
            if state.record_sync_failure(failure) {
                paper_warn!(job: job_id; "too many consecutive sync errors, polling halted");
                vec![Effect::CancelPolling { generation }]
            } else {
                Vec::new()
            }
        }
        Msg::FetchRejected {
            job_id,
            generation,
            seq,
            rejection,
        } => {
            if !state.accepts(&job_id, generation, seq) {
                return (state, Vec::new());
            }
            let transition = state.apply_rejection(rejection);
            cancel_if_terminal(&state, transition)
        }
        Msg::SectionToggled(key) => {
            if !state.with_visibility(|visibility| {
                visibility.toggle(key);
            }) {
                paper_debug!("toggle of {:?} ignored: no completed job", key);
            }
            Vec::new()
        }
        Msg::ExpandAll => {
            state.with_visibility(|visibility| visibility.expand_all());
            Vec::new()
        }
        Msg::CollapseAll => {
            state.with_visibility(|visibility| visibility.collapse_all());
            Vec::new()
        }
        Msg::StopTracking => match state.clear_session() {
            Some(generation) => vec![Effect::CancelPolling { generation }],
            None => Vec::new(),
        },
        Msg::PollingStopped { job_id, generation } => {
            if state.polling_ended(&job_id, generation) {
                paper_warn!(job: job_id; "polling ended without a final status");
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn track_job(state: &mut TrackerState, job_id: JobId, initial: Option<JobSnapshot>) -> Vec<Effect> {
    if let Some(session) = state.session() {
        if session.machine.job_id() == &job_id {
            if session.polling || session.machine.phase().is_terminal() {
                paper_debug!(job: job_id; "already tracked, re-subscribe is a no-op");
                return Vec::new();
            }
            let last = session.snapshot.clone();
            return match state.resume_polling() {
                Some(generation) => {
                    paper_info!(job: job_id; "resuming polling (generation {})", generation);
                    vec![Effect::StartPolling {
                        job_id,
                        generation,
                        initial: last,
                    }]
                }
                None => Vec::new(),
            };
        }
    }

    let mut effects = Vec::new();
    if let Some(previous) = state.replace_session(job_id.clone()) {
        effects.push(Effect::CancelPolling {
            generation: previous,
        });
    }

    if state.restore_finished() {
        paper_info!(job: job_id; "already finished, restored without polling");
        return effects;
    }

    let initial = initial.filter(|snapshot| {
        let matches = snapshot.job_id == job_id;
        if !matches {
            paper_warn!(job: job_id; "discarding initial snapshot for {}", snapshot.job_id);
        }
        matches
    });
    if let Some(snapshot) = &initial {
        state.apply_snapshot(snapshot.clone());
    }

    if state.phase().is_some_and(|phase| phase.is_terminal()) {
        paper_info!(job: job_id; "hydrated in a terminal state, not polling");
        return effects;
    }

    if let Some(generation) = state.arm_polling() {
        effects.push(Effect::StartPolling {
            job_id,
            generation,
            initial,
        });
    }
    effects
}

fn cancel_if_terminal(state: &TrackerState, transition: Transition) -> Vec<Effect> {
    if transition == Transition::Terminal {
        vec![Effect::CancelPolling {
            generation: state.generation(),
        }]
    } else {
        Vec::new()
    }
}
