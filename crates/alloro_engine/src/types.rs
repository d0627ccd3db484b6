use std::fmt;

use alloro_core::{JobId, JobKind, JobSnapshot, RankingResult};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RankingTriggered {
        job_id: JobId,
    },
    TriggerFailed {
        error: ApiError,
    },
    /// Latest status of a polled job, terminal snapshots included.
    Status(JobSnapshot),
    PollTimedOut {
        job_id: JobId,
        kind: JobKind,
        attempts: u32,
    },
    ResultFetched {
        job_id: JobId,
        result: Result<RankingResult, ApiError>,
    },
    OnboardingFinished {
        result: Result<Option<String>, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// Response body did not have the expected shape.
    Decode,
    /// Server answered `success: false`.
    Rejected,
    /// The session role does not allow the operation.
    Forbidden,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Forbidden => write!(f, "forbidden"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build api client: {0}")]
    Client(#[from] ApiError),
}
