use alloro_core::{update, AppState, JobId, JobKind, JobSnapshot, JobStatus, Msg};

fn unknown() -> JobId {
    JobId::from(404u64)
}

#[test]
fn noop_and_tick_leave_state_untouched() {
    for msg in [Msg::NoOp, Msg::Tick] {
        let state = AppState::new();
        let (mut next, effects) = update(state.clone(), msg);

        assert_eq!(state, next);
        assert!(effects.is_empty());
        assert!(!next.consume_dirty());
    }
}

#[test]
fn messages_for_unwatched_jobs_are_ignored() {
    let msgs = vec![
        Msg::StatusUpdated(JobSnapshot::new(
            unknown(),
            JobKind::Ranking,
            JobStatus::Completed,
        )),
        Msg::PollTimedOut {
            job_id: unknown(),
            attempts: 15,
        },
        Msg::RetryClicked { job_id: unknown() },
        Msg::ResultRequested { job_id: unknown() },
        Msg::ResultUnavailable {
            job_id: unknown(),
            message: "gone".to_string(),
        },
        Msg::ViewClosed { job_id: unknown() },
    ];

    for msg in msgs {
        let state = AppState::new();
        let (mut next, effects) = update(state.clone(), msg.clone());

        assert!(effects.is_empty(), "{msg:?} produced effects");
        assert!(next.store().is_empty(), "{msg:?} created a job");
        assert!(!next.consume_dirty(), "{msg:?} dirtied the view");
    }
}

#[test]
fn onboarding_replies_without_a_pending_call_are_ignored() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::OnboardingCompleted);
    assert!(effects.is_empty());
    assert_eq!(state, next);

    let (next, _) = update(
        state.clone(),
        Msg::OnboardingFailed {
            message: "late".to_string(),
        },
    );
    assert_eq!(state, next);
}
