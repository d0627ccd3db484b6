use crate::{JobId, JobSnapshot, RankingResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked for a new ranking analysis.
    RankingRequested {
        practice_name: String,
        location: Option<String>,
    },
    /// Server accepted the ranking trigger and assigned a job id.
    RankingTriggered { job_id: JobId },
    /// Server refused the ranking trigger or the request failed.
    TriggerFailed { message: String },
    /// Open the view for an already running ranking job.
    RankingOpened { job_id: JobId },
    /// Browser returned from checkout; start confirming the subscription.
    BillingCheckoutReturned { job_id: JobId },
    /// A status poll produced a snapshot.
    StatusUpdated(JobSnapshot),
    /// A bounded poll ran out of attempts.
    PollTimedOut { job_id: JobId, attempts: u32 },
    /// User clicked Retry on a timed-out job.
    RetryClicked { job_id: JobId },
    /// The view (re)expanded the results of a job.
    ResultRequested { job_id: JobId },
    /// Engine delivered the full ranking result.
    ResultLoaded(RankingResult),
    /// Job succeeded but its results could not be retrieved.
    ResultUnavailable { job_id: JobId, message: String },
    /// Onboarding completion call succeeded.
    OnboardingCompleted,
    /// Onboarding completion call failed.
    OnboardingFailed { message: String },
    /// User asked to retry a failed onboarding completion.
    OnboardingRetryClicked,
    /// The view showing a job went away.
    ViewClosed { job_id: JobId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
