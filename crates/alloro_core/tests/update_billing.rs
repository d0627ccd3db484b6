use alloro_core::{
    update, AppState, Effect, JobId, JobKind, JobSnapshot, JobStatus, Msg, OnboardingState,
    Route, PAYMENT_RECEIVED_MESSAGE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    alloro_logging::initialize_for_tests();
}

fn session() -> JobId {
    JobId::from("cs_test_a1")
}

fn returned_from_checkout() -> AppState {
    let (state, effects) = update(
        AppState::new(),
        Msg::BillingCheckoutReturned { job_id: session() },
    );
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: session(),
            kind: JobKind::Billing,
        }]
    );
    state
}

fn timed_out() -> AppState {
    let state = returned_from_checkout();
    let (state, effects) = update(
        state,
        Msg::PollTimedOut {
            job_id: session(),
            attempts: 15,
        },
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn checkout_return_shows_confirming_banner() {
    init_logging();
    let view = returned_from_checkout().view();
    assert_eq!(view.jobs[0].message, "Confirming payment...");
    assert!(!view.jobs[0].can_retry);
    assert_eq!(view.onboarding, OnboardingState::Idle);
}

#[test]
fn timeout_shows_payment_received_with_retry() {
    init_logging();
    let view = timed_out().view();
    let row = &view.jobs[0];
    assert_eq!(row.status, JobStatus::Timeout);
    assert_eq!(row.message, PAYMENT_RECEIVED_MESSAGE);
    assert!(row.can_retry);
}

#[test]
fn retry_after_timeout_requests_one_check_and_can_time_out_again() {
    init_logging();
    let (state, effects) = update(timed_out(), Msg::RetryClicked { job_id: session() });
    assert_eq!(
        effects,
        vec![Effect::RetryCheck {
            job_id: session(),
            kind: JobKind::Billing,
        }]
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Processing);

    // Double click while the check is in flight does nothing.
    let (state, effects) = update(state, Msg::RetryClicked { job_id: session() });
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Processing)),
    );
    let (state, _) = update(
        state,
        Msg::PollTimedOut {
            job_id: session(),
            attempts: 1,
        },
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Timeout);
}

#[test]
fn retry_is_ignored_unless_timed_out() {
    init_logging();
    let (_state, effects) = update(
        returned_from_checkout(),
        Msg::RetryClicked { job_id: session() },
    );
    assert!(effects.is_empty());
}

#[test]
fn active_subscription_completes_onboarding_then_navigates() {
    init_logging();
    let (state, effects) = update(
        returned_from_checkout(),
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Completed)),
    );
    assert_eq!(effects, vec![Effect::CompleteOnboarding]);
    let view = state.view();
    assert_eq!(view.onboarding, OnboardingState::Completing);
    assert_eq!(view.jobs[0].badge, "Active");
    assert_eq!(view.navigation, None);

    let (state, effects) = update(state, Msg::OnboardingCompleted);
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.onboarding, OnboardingState::Completed);
    assert_eq!(view.navigation, Some(Route::Dashboard));
}

#[test]
fn retry_that_finds_active_subscription_completes_onboarding() {
    init_logging();
    let (state, _) = update(timed_out(), Msg::RetryClicked { job_id: session() });
    let (_state, effects) = update(
        state,
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Completed)),
    );
    assert_eq!(effects, vec![Effect::CompleteOnboarding]);
}

#[test]
fn onboarding_failure_keeps_user_on_page() {
    init_logging();
    let (state, _) = update(
        returned_from_checkout(),
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Completed)),
    );
    let (state, effects) = update(
        state,
        Msg::OnboardingFailed {
            message: "Onboarding already completed".to_string(),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(
        view.onboarding,
        OnboardingState::Failed("Onboarding already completed".to_string())
    );
    assert_eq!(view.navigation, None);
    assert_eq!(view.notice.unwrap().text, "Onboarding already completed");
}

#[test]
fn failed_onboarding_can_be_retried_until_it_succeeds() {
    init_logging();
    let (state, _) = update(
        returned_from_checkout(),
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Completed)),
    );
    let (state, _) = update(
        state,
        Msg::OnboardingFailed {
            message: "network error".to_string(),
        },
    );

    let (state, effects) = update(state, Msg::OnboardingRetryClicked);
    assert_eq!(effects, vec![Effect::CompleteOnboarding]);
    assert_eq!(state.view().onboarding, OnboardingState::Completing);

    let (state, effects) = update(state, Msg::OnboardingRetryClicked);
    assert!(effects.is_empty(), "a call is already in flight");

    let (state, _) = update(state, Msg::OnboardingCompleted);
    assert_eq!(state.view().navigation, Some(Route::Dashboard));
}

#[test]
fn stray_onboarding_messages_are_ignored() {
    init_logging();
    let (state, effects) = update(returned_from_checkout(), Msg::OnboardingRetryClicked);
    assert!(effects.is_empty());
    let (state, _) = update(state, Msg::OnboardingCompleted);
    assert_eq!(state.view().navigation, None);
    assert_eq!(state.view().onboarding, OnboardingState::Idle);
}

#[test]
fn failed_billing_status_is_reported() {
    init_logging();
    let (state, effects) = update(
        returned_from_checkout(),
        Msg::StatusUpdated(JobSnapshot::new(session(), JobKind::Billing, JobStatus::Failed)),
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.view().notice.unwrap().text,
        "Payment could not be confirmed"
    );
}
