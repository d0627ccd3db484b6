//! Alloro engine: REST client, status polling and effect execution.
mod api;
mod engine;
mod normalize;
mod poller;
mod results;
mod session;
mod types;

pub use api::{AlloroApi, ApiSettings, RankingRequest, ReqwestApi, DEFAULT_BASE_URL};
pub use engine::{EngineHandle, EngineSettings};
pub use normalize::{
    normalize_billing_status, normalize_job_id, normalize_ranking_result,
    normalize_ranking_status, BillingStatusWire,
};
pub use poller::{
    check_once, PollHandle, PollOutcome, PollRegistry, PollSettings, PollTicket, StatusFetch,
    StatusPoller, StatusSink, BILLING_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
pub use results::ResultFetcher;
pub use session::{Role, SessionContext};
pub use types::{ApiError, EngineError, EngineEvent, FailureKind};
