use crate::state::{Notice, OnboardingState, ResultState, Route};
use crate::{JobId, JobKind, JobSnapshot, JobStatus, RankingResult};

pub const DEFAULT_PENDING_MESSAGE: &str = "Waiting to start...";
pub const DEFAULT_PROCESSING_MESSAGE: &str = "Processing...";
pub const PAYMENT_RECEIVED_MESSAGE: &str =
    "Payment received. Your subscription is still being activated.";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub job_count: usize,
    pub jobs: Vec<JobRowView>,
    pub onboarding: OnboardingState,
    pub navigation: Option<Route>,
    pub notice: Option<Notice>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn job(&self, id: &JobId) -> Option<&JobRowView> {
        self.jobs.iter().find(|row| &row.job_id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    NotRequested,
    Loading,
    Ready(RankingResult),
    Unavailable(String),
}

/// One rendered job: progress bar, badge, message and any result section.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub badge: &'static str,
    pub progress_percent: u8,
    pub message: String,
    pub steps_completed: Vec<String>,
    pub score_line: Option<String>,
    pub result: ResultView,
    pub can_retry: bool,
}

impl JobRowView {
    pub(crate) fn build(job: &JobSnapshot, result: Option<&ResultState>) -> Self {
        let detail = job.detail.as_ref();
        let progress_percent = match job.status {
            JobStatus::Completed => 100,
            _ => detail.and_then(|d| d.progress).unwrap_or(0).min(100),
        };
        let detail_message = detail
            .and_then(|d| d.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let message = match (job.kind, job.status) {
            (JobKind::Billing, status) => billing_message(status).to_string(),
            (JobKind::Ranking, JobStatus::Pending) => detail_message
                .unwrap_or(DEFAULT_PENDING_MESSAGE)
                .to_string(),
            (JobKind::Ranking, JobStatus::Processing) => detail_message
                .unwrap_or(DEFAULT_PROCESSING_MESSAGE)
                .to_string(),
            (JobKind::Ranking, JobStatus::Completed) => detail_message
                .unwrap_or("Analysis complete")
                .to_string(),
            (JobKind::Ranking, JobStatus::Failed) => {
                detail_message.unwrap_or("Analysis failed").to_string()
            }
            (JobKind::Ranking, JobStatus::Timeout) => {
                "Still running. Check again later.".to_string()
            }
        };

        let score_line = match (job.kind, job.status) {
            (JobKind::Ranking, JobStatus::Completed) => Some(score_line(job)),
            _ => None,
        };

        let result = match result {
            None => ResultView::NotRequested,
            Some(ResultState::Loading) => ResultView::Loading,
            Some(ResultState::Ready(ranking)) => ResultView::Ready(ranking.clone()),
            Some(ResultState::Unavailable(message)) => ResultView::Unavailable(message.clone()),
        };

        Self {
            job_id: job.id.clone(),
            kind: job.kind,
            status: job.status,
            badge: badge(job.kind, job.status),
            progress_percent,
            message,
            steps_completed: detail.map(|d| d.steps_completed.clone()).unwrap_or_default(),
            score_line,
            result,
            can_retry: job.kind == JobKind::Billing && job.status == JobStatus::Timeout,
        }
    }
}

pub fn badge(kind: JobKind, status: JobStatus) -> &'static str {
    match (kind, status) {
        (_, JobStatus::Pending) => "Pending",
        (_, JobStatus::Processing) => "Processing",
        (JobKind::Ranking, JobStatus::Completed) => "Completed",
        (JobKind::Billing, JobStatus::Completed) => "Active",
        (_, JobStatus::Failed) => "Failed",
        (_, JobStatus::Timeout) => "Timed out",
    }
}

fn billing_message(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending | JobStatus::Processing => "Confirming payment...",
        JobStatus::Completed => "Subscription active",
        JobStatus::Failed => "Payment could not be confirmed",
        JobStatus::Timeout => PAYMENT_RECEIVED_MESSAGE,
    }
}

fn score_line(job: &JobSnapshot) -> String {
    let score = job
        .rank_score
        .map(format_score)
        .unwrap_or_else(|| "n/a".to_string());
    match (job.rank_position, job.total_competitors) {
        (Some(position), Some(total)) => {
            format!("Rank score {score} (position {position} of {total})")
        }
        (Some(position), None) => format!("Rank score {score} (position {position})"),
        _ => format!("Rank score {score}"),
    }
}

pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}
