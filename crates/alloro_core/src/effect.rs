use crate::{JobId, JobKind};

/// Side effects requested by [`crate::update`]; the caller executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    TriggerRanking {
        practice_name: String,
        location: Option<String>,
    },
    StartPolling { job_id: JobId, kind: JobKind },
    StopPolling { job_id: JobId },
    /// One immediate status check for a timed-out job.
    RetryCheck { job_id: JobId, kind: JobKind },
    FetchResult { job_id: JobId },
    CompleteOnboarding,
}
