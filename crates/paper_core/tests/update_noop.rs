use paper_core::{update, Msg, TrackerState};

#[test]
fn polling_stopped_without_session_is_noop() {
    let state = TrackerState::new();
    let (next, effects) = update(
        state.clone(),
        Msg::PollingStopped {
            job_id: paper_core::JobId::from("1"),
            generation: 0,
        },
    );

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn tick_and_stop_without_session_are_noops() {
    let state = TrackerState::new();
    let (next, effects) = update(state.clone(), Msg::Tick);
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(next, Msg::StopTracking);
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn toggles_without_completed_job_are_ignored() {
    let state = TrackerState::new();
    let (mut next, effects) = update(state, Msg::SectionToggled(paper_core::SectionKey::Methods));
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}
