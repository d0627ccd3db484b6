use crate::state::{NoticeLevel, OnboardingState, ResultState, Route};
use crate::{AppState, Effect, JobId, JobKind, JobSnapshot, JobStatus, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RankingRequested {
            practice_name,
            location,
        } => {
            let practice_name = practice_name.trim().to_string();
            if practice_name.is_empty() {
                state.notify(NoticeLevel::Error, "Enter a practice name first");
                Vec::new()
            } else {
                vec![Effect::TriggerRanking {
                    practice_name,
                    location: location
                        .map(|loc| loc.trim().to_string())
                        .filter(|loc| !loc.is_empty()),
                }]
            }
        }
        Msg::RankingTriggered { job_id } | Msg::RankingOpened { job_id } => {
            start_watching(&mut state, job_id, JobKind::Ranking)
        }
        Msg::TriggerFailed { message } => {
            state.notify(
                NoticeLevel::Error,
                format!("Could not start ranking analysis: {message}"),
            );
            Vec::new()
        }
        Msg::BillingCheckoutReturned { job_id } => {
            start_watching(&mut state, job_id, JobKind::Billing)
        }
        Msg::StatusUpdated(snapshot) => apply_status(&mut state, snapshot),
        Msg::PollTimedOut { job_id, .. } => {
            if state.store_mut().mark_timeout(&job_id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        // Only bounded billing polls time out and offer a retry.
        Msg::RetryClicked { job_id } => match state.job(&job_id).map(|job| job.kind) {
            Some(JobKind::Billing) if state.store_mut().reopen(&job_id) => {
                state.mark_dirty();
                vec![Effect::RetryCheck {
                    job_id,
                    kind: JobKind::Billing,
                }]
            }
            _ => Vec::new(),
        },
        Msg::ResultRequested { job_id } => request_result(&mut state, job_id),
        Msg::ResultLoaded(result) => {
            if state.is_watching(&result.job_id) {
                state.set_result(result.job_id.clone(), ResultState::Ready(result));
            }
            Vec::new()
        }
        Msg::ResultUnavailable { job_id, message } => {
            if state.is_watching(&job_id) {
                state.set_result(job_id, ResultState::Unavailable(message));
                state.notify(
                    NoticeLevel::Error,
                    "Analysis finished but its results are unavailable right now",
                );
            }
            Vec::new()
        }
        Msg::OnboardingCompleted => {
            if *state.onboarding() == OnboardingState::Completing {
                state.set_onboarding(OnboardingState::Completed);
                state.navigate(Route::Dashboard);
            }
            Vec::new()
        }
        Msg::OnboardingFailed { message } => {
            if *state.onboarding() == OnboardingState::Completing {
                state.set_onboarding(OnboardingState::Failed(message.clone()));
                state.notify(NoticeLevel::Error, message);
            }
            Vec::new()
        }
        Msg::OnboardingRetryClicked => {
            if matches!(state.onboarding(), OnboardingState::Failed(_)) {
                state.set_onboarding(OnboardingState::Completing);
                vec![Effect::CompleteOnboarding]
            } else {
                Vec::new()
            }
        }
        Msg::ViewClosed { job_id } => {
            if state.unwatch(&job_id) {
                vec![Effect::StopPolling { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_watching(state: &mut AppState, job_id: JobId, kind: JobKind) -> Vec<Effect> {
    // A second trigger for a job that is already tracked must not spawn
    // another poll loop.
    if state.watch(job_id.clone(), kind) {
        vec![Effect::StartPolling { job_id, kind }]
    } else {
        Vec::new()
    }
}

fn apply_status(state: &mut AppState, snapshot: JobSnapshot) -> Vec<Effect> {
    // Updates for jobs whose view is gone are dropped.
    if !state.is_watching(&snapshot.id) {
        return Vec::new();
    }
    let job_id = snapshot.id.clone();
    let kind = snapshot.kind;
    let status = snapshot.status;
    if !state.store_mut().apply(snapshot) {
        return Vec::new();
    }
    state.mark_dirty();

    match (kind, status) {
        (JobKind::Ranking, JobStatus::Completed) => request_result(state, job_id),
        (JobKind::Ranking, JobStatus::Failed) => {
            state.notify(NoticeLevel::Error, "Ranking analysis failed");
            Vec::new()
        }
        (JobKind::Billing, JobStatus::Completed) => {
            if *state.onboarding() == OnboardingState::Idle {
                state.set_onboarding(OnboardingState::Completing);
                state.notify(NoticeLevel::Info, "Subscription active");
                vec![Effect::CompleteOnboarding]
            } else {
                Vec::new()
            }
        }
        (JobKind::Billing, JobStatus::Failed) => {
            state.notify(NoticeLevel::Error, "Payment could not be confirmed");
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn request_result(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    let completed_ranking = state
        .job(&job_id)
        .is_some_and(|job| job.kind == JobKind::Ranking && job.status == JobStatus::Completed);
    if !completed_ranking {
        return Vec::new();
    }
    match state.result(&job_id) {
        Some(ResultState::Ready(_)) | Some(ResultState::Loading) => Vec::new(),
        Some(ResultState::Unavailable(_)) | None => {
            state.set_result(job_id.clone(), ResultState::Loading);
            vec![Effect::FetchResult { job_id }]
        }
    }
}
