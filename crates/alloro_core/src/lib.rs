//! Alloro core: job data model, status store and the pure update loop.
mod effect;
mod job;
mod msg;
mod state;
mod store;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{
    clamp_progress, Competitor, JobId, JobKind, JobSnapshot, JobStatus, RankingResult,
    StatusDetail,
};
pub use msg::Msg;
pub use state::{AppState, Notice, NoticeLevel, OnboardingState, ResultState, Route};
pub use store::JobStateStore;
pub use update::update;
pub use view_model::{
    badge, format_score, AppViewModel, JobRowView, ResultView, DEFAULT_PENDING_MESSAGE,
    DEFAULT_PROCESSING_MESSAGE, PAYMENT_RECEIVED_MESSAGE,
};
