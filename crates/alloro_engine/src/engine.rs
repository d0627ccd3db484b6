use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use alloro_core::{JobId, JobKind};
use alloro_logging::{alloro_debug, alloro_info, alloro_warn};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::api::{AlloroApi, ApiSettings, RankingRequest, ReqwestApi};
use crate::poller::{
    check_once, PollOutcome, PollRegistry, PollSettings, PollTicket, StatusFetch, StatusPoller,
    StatusSink,
};
use crate::results::ResultFetcher;
use crate::{EngineError, EngineEvent, SessionContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub ranking_poll: PollSettings,
    pub billing_poll: PollSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            ranking_poll: PollSettings::ranking(),
            billing_poll: PollSettings::billing(),
        }
    }
}

impl EngineSettings {
    pub fn poll_settings(&self, kind: JobKind) -> PollSettings {
        match kind {
            JobKind::Ranking => self.ranking_poll,
            JobKind::Billing => self.billing_poll,
        }
    }
}

enum EngineCommand {
    TriggerRanking(RankingRequest),
    StartPolling { job_id: JobId, kind: JobKind },
    StopPolling { job_id: JobId },
    RetryCheck { job_id: JobId, kind: JobKind },
    FetchResult { job_id: JobId },
    CompleteOnboarding,
}

struct EngineContext {
    api: Arc<dyn AlloroApi>,
    registry: Arc<PollRegistry>,
    results: ResultFetcher<dyn AlloroApi>,
    settings: EngineSettings,
}

/// Runs API calls and poll loops on a background tokio runtime.
///
/// Commands go in through the handle's methods, results come back as
/// [`EngineEvent`]s via [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    registry: Arc<PollRegistry>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, session: SessionContext) -> Result<Self, EngineError> {
        let api = Arc::new(ReqwestApi::new(&settings.api, session)?);
        Self::with_api(api, settings)
    }

    pub fn with_api(
        api: Arc<dyn AlloroApi>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("alloro-engine")
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let registry = Arc::new(PollRegistry::new());
        let context = Arc::new(EngineContext {
            results: ResultFetcher::new(api.clone()),
            api,
            registry: registry.clone(),
            settings,
        });

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                dispatch(&runtime, &context, command, &event_tx);
            }
            context.registry.stop_all();
            runtime.shutdown_timeout(Duration::from_millis(250));
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            registry,
        })
    }

    pub fn trigger_ranking(&self, practice_name: impl Into<String>, location: Option<String>) {
        self.send(EngineCommand::TriggerRanking(RankingRequest {
            practice_name: practice_name.into(),
            location,
        }));
    }

    pub fn start_polling(&self, job_id: JobId, kind: JobKind) {
        self.send(EngineCommand::StartPolling { job_id, kind });
    }

    /// Takes effect immediately: no event for `job_id` is emitted afterwards.
    pub fn stop_polling(&self, job_id: JobId) {
        self.registry.stop(&job_id);
        self.send(EngineCommand::StopPolling { job_id });
    }

    pub fn retry_check(&self, job_id: JobId, kind: JobKind) {
        self.send(EngineCommand::RetryCheck { job_id, kind });
    }

    pub fn fetch_result(&self, job_id: JobId) {
        self.send(EngineCommand::FetchResult { job_id });
    }

    pub fn complete_onboarding(&self) {
        self.send(EngineCommand::CompleteOnboarding);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn active_polls(&self) -> usize {
        self.registry.active_count()
    }

    pub fn is_polling(&self, job_id: &JobId) -> bool {
        self.registry.is_active(job_id)
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.registry.stop_all();
    }
}

/// Forwards poll updates as engine events until the poll is cancelled.
struct ChannelStatusSink {
    tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl StatusSink for ChannelStatusSink {
    fn emit(&self, snapshot: alloro_core::JobSnapshot) {
        if !self.cancel.is_cancelled() {
            let _ = self.tx.send(EngineEvent::Status(snapshot));
        }
    }
}

/// Registration and cancellation happen here, in command order; the IO
/// itself runs on the runtime.
fn dispatch(
    runtime: &tokio::runtime::Runtime,
    context: &Arc<EngineContext>,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    let context = context.clone();
    let event_tx = event_tx.clone();
    match command {
        EngineCommand::TriggerRanking(request) => {
            runtime.spawn(async move {
                trigger_ranking(&context, request, event_tx).await;
            });
        }
        EngineCommand::StartPolling { job_id, kind } => {
            let Some(ticket) = context.registry.try_register(&job_id) else {
                alloro_debug!("Job {} is already being polled", job_id);
                return;
            };
            alloro_info!("Polling job {} ({:?})", job_id, kind);
            runtime.spawn(async move {
                run_poll(&context, ticket, kind, event_tx).await;
            });
        }
        EngineCommand::StopPolling { job_id } => {
            context.registry.stop(&job_id);
            context.results.invalidate(&job_id);
            alloro_debug!("Stopped polling job {}", job_id);
        }
        EngineCommand::RetryCheck { job_id, kind } => {
            let Some(ticket) = context.registry.try_register(&job_id) else {
                alloro_debug!("Retry for job {} ignored, poll still running", job_id);
                return;
            };
            runtime.spawn(async move {
                run_retry(&context, ticket, kind, event_tx).await;
            });
        }
        EngineCommand::FetchResult { job_id } => {
            runtime.spawn(async move {
                let result = context.results.fetch(&job_id).await;
                let _ = event_tx.send(EngineEvent::ResultFetched { job_id, result });
            });
        }
        EngineCommand::CompleteOnboarding => {
            runtime.spawn(async move {
                let result = context.api.complete_onboarding().await;
                if let Err(err) = &result {
                    alloro_warn!("Completing onboarding failed: {}", err);
                }
                let _ = event_tx.send(EngineEvent::OnboardingFinished { result });
            });
        }
    }
}

async fn trigger_ranking(
    context: &EngineContext,
    request: RankingRequest,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    alloro_info!("Triggering ranking for {:?}", request.practice_name);
    let event = match context.api.trigger_ranking(&request).await {
        Ok(job_id) => {
            alloro_info!("Ranking job {} created", job_id);
            EngineEvent::RankingTriggered { job_id }
        }
        Err(error) => {
            alloro_warn!("Ranking trigger failed: {}", error);
            EngineEvent::TriggerFailed { error }
        }
    };
    let _ = event_tx.send(event);
}

async fn run_poll(
    context: &EngineContext,
    ticket: PollTicket,
    kind: JobKind,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let poller = StatusPoller::new(
        ticket.job_id.clone(),
        context.settings.poll_settings(kind),
        status_fetch(context.api.clone(), kind),
    );
    let sink = ChannelStatusSink {
        tx: event_tx.clone(),
        cancel: ticket.cancel.clone(),
    };
    let outcome = poller.run(&ticket.cancel, &sink).await;

    // Release the registration before reporting, so the terminal event is
    // the last thing this loop does.
    context.registry.finish(&ticket);
    if ticket.cancel.is_cancelled() {
        return;
    }
    let event = match outcome {
        PollOutcome::Terminal(snapshot) => EngineEvent::Status(snapshot),
        PollOutcome::TimedOut { attempts } => EngineEvent::PollTimedOut {
            job_id: ticket.job_id.clone(),
            kind,
            attempts,
        },
        PollOutcome::Cancelled => return,
    };
    let _ = event_tx.send(event);
}

async fn run_retry(
    context: &EngineContext,
    ticket: PollTicket,
    kind: JobKind,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let fetch = status_fetch(context.api.clone(), kind);
    let result = tokio::select! {
        biased;
        _ = ticket.cancel.cancelled() => None,
        result = check_once(&fetch, &ticket.job_id) => Some(result),
    };
    context.registry.finish(&ticket);
    let Some(result) = result else {
        return;
    };
    if ticket.cancel.is_cancelled() {
        return;
    }

    match result {
        Ok(snapshot) if snapshot.is_terminal() => {
            alloro_info!("Retry found job {} {}", ticket.job_id, snapshot.status);
            let _ = event_tx.send(EngineEvent::Status(snapshot));
        }
        Ok(snapshot) => {
            let _ = event_tx.send(EngineEvent::Status(snapshot));
            let _ = event_tx.send(EngineEvent::PollTimedOut {
                job_id: ticket.job_id.clone(),
                kind,
                attempts: 1,
            });
        }
        Err(err) => {
            alloro_debug!("Retry check for job {} failed: {}", ticket.job_id, err);
            let _ = event_tx.send(EngineEvent::PollTimedOut {
                job_id: ticket.job_id.clone(),
                kind,
                attempts: 1,
            });
        }
    }
}

fn status_fetch(api: Arc<dyn AlloroApi>, kind: JobKind) -> StatusFetch {
    Arc::new(move |job_id: JobId| {
        let api = api.clone();
        async move {
            match kind {
                JobKind::Ranking => api.ranking_status(&job_id).await,
                JobKind::Billing => api.billing_status(&job_id).await,
            }
        }
        .boxed()
    })
}
