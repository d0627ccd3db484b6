use std::collections::BTreeMap;
use std::fmt;

/// Opaque server-assigned job identifier. Ranking jobs use integers, billing
/// checkouts use session strings; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Ranking,
    Billing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Timeout
        )
    }

    /// Parses a server status string. Unknown values count as in-flight work.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => JobStatus::Pending,
            "completed" | "complete" | "done" | "active" | "success" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            "timeout" => JobStatus::Timeout,
            _ => JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusDetail {
    /// Percentage in `0..=100`.
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub steps_completed: Vec<String>,
    pub step_timestamps: BTreeMap<String, String>,
}

impl StatusDetail {
    pub fn with_progress(progress: f64, message: impl Into<String>) -> Self {
        Self {
            progress: Some(clamp_progress(progress)),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

pub fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Latest known state of one job as reported by a status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub detail: Option<StatusDetail>,
    pub rank_score: Option<f64>,
    pub rank_position: Option<u32>,
    pub total_competitors: Option<u32>,
}

impl JobSnapshot {
    pub fn new(id: impl Into<JobId>, kind: JobKind, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            kind,
            status,
            detail: None,
            rank_score: None,
            rank_position: None,
            total_competitors: None,
        }
    }

    pub fn pending(id: impl Into<JobId>, kind: JobKind) -> Self {
        Self::new(id, kind, JobStatus::Pending)
    }

    pub fn with_detail(mut self, detail: StatusDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Competitor {
    pub name: String,
    pub score: Option<f64>,
    pub position: Option<u32>,
    pub review_count: Option<u32>,
    pub rating: Option<f64>,
}

/// Full output of a completed ranking analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingResult {
    pub job_id: JobId,
    pub practice_name: String,
    pub location: Option<String>,
    pub rank_score: Option<f64>,
    pub rank_position: Option<u32>,
    pub total_competitors: Option<u32>,
    pub competitors: Vec<Competitor>,
    pub analysis: Option<String>,
}
