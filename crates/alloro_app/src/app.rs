use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use alloro_core::{
    update, AppState, AppViewModel, JobId, JobKind, JobStatus, Msg, NoticeLevel,
    OnboardingState, ResultView, Route,
};
use alloro_engine::EngineHandle;
use alloro_logging::{alloro_debug, alloro_info};

use crate::effects::EffectRunner;
use crate::render::Renderer;

const TICK: Duration = Duration::from_millis(75);

/// What the user asked the binary to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Rank {
        practice_name: String,
        location: Option<String>,
    },
    WatchRanking {
        job_id: JobId,
    },
    ConfirmBilling {
        job_id: JobId,
    },
}

impl Session {
    fn opening_msg(&self) -> Msg {
        match self {
            Session::Rank {
                practice_name,
                location,
            } => Msg::RankingRequested {
                practice_name: practice_name.clone(),
                location: location.clone(),
            },
            Session::WatchRanking { job_id } => Msg::RankingOpened {
                job_id: job_id.clone(),
            },
            Session::ConfirmBilling { job_id } => Msg::BillingCheckoutReturned {
                job_id: job_id.clone(),
            },
        }
    }

    fn kind(&self) -> JobKind {
        match self {
            Session::Rank { .. } | Session::WatchRanking { .. } => JobKind::Ranking,
            Session::ConfirmBilling { .. } => JobKind::Billing,
        }
    }

    fn known_job(&self) -> Option<JobId> {
        match self {
            Session::Rank { .. } => None,
            Session::WatchRanking { job_id } | Session::ConfirmBilling { job_id } => {
                Some(job_id.clone())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    Quit,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Succeeded => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
            Outcome::Quit => ExitCode::from(130),
        }
    }
}

/// Runs the session until its job finishes or the user quits.
pub fn run(engine: EngineHandle, session: Session) -> io::Result<Outcome> {
    let input = spawn_input_reader();
    let stdout = io::stdout();
    let mut app = App::new(EffectRunner::new(engine), session, stdout.lock());
    app.run(&input)
}

struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    session: Session,
    target: Option<JobId>,
    renderer: Renderer,
    out: W,
}

impl<W: Write> App<W> {
    fn new(runner: EffectRunner, session: Session, out: W) -> Self {
        Self {
            state: AppState::new(),
            runner,
            target: session.known_job(),
            session,
            renderer: Renderer::default(),
            out,
        }
    }

    fn run(&mut self, input: &mpsc::Receiver<String>) -> io::Result<Outcome> {
        self.dispatch_msg(self.session.opening_msg())?;
        let mut input_open = true;
        loop {
            for msg in self.runner.drain(TICK) {
                self.dispatch_msg(msg)?;
            }

            let view = self.state.view();
            if self.target.is_none() {
                self.target = view
                    .jobs
                    .iter()
                    .find(|row| row.kind == self.session.kind())
                    .map(|row| row.job_id.clone());
            }
            if let Some(outcome) = decide(self.session.kind(), self.target.as_ref(), &view) {
                alloro_info!("Session finished: {:?}", outcome);
                self.close()?;
                return Ok(outcome);
            }

            let retry = retry_msg(self.target.as_ref(), &view);
            if input_open {
                match input.try_recv() {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        self.close()?;
                        return Ok(Outcome::Quit);
                    }
                    Ok(_) => {
                        if let Some(msg) = retry.clone() {
                            alloro_info!("Retrying: {:?}", msg);
                            self.dispatch_msg(msg)?;
                        }
                    }
                    Err(mpsc::TryRecvError::Empty) => {}
                    Err(mpsc::TryRecvError::Disconnected) => {
                        alloro_debug!("stdin closed");
                        input_open = false;
                    }
                }
            }
            if !input_open && retry.is_some() {
                // An unanswerable retry prompt ends the session unfinished.
                self.close()?;
                return Ok(Outcome::Failed);
            }
        }
    }

    fn dispatch_msg(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;
        self.runner.enqueue(effects);
        match view {
            Some(view) => self.render(&view),
            None => Ok(()),
        }
    }

    fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        for line in self.renderer.frame(view) {
            writeln!(self.out, "{stamp} {line}")?;
        }
        self.out.flush()
    }

    /// Closes the job view, which stops its poll.
    fn close(&mut self) -> io::Result<()> {
        if let Some(job_id) = self.target.clone() {
            self.dispatch_msg(Msg::ViewClosed { job_id })?;
        }
        Ok(())
    }
}

/// Decides whether the session is over given the latest view.
fn decide(kind: JobKind, target: Option<&JobId>, view: &AppViewModel) -> Option<Outcome> {
    let Some(row) = target.and_then(|id| view.job(id)) else {
        // The trigger was refused before any job existed.
        let refused = target.is_none()
            && view
                .notice
                .as_ref()
                .is_some_and(|notice| notice.level == NoticeLevel::Error);
        return refused.then_some(Outcome::Failed);
    };

    match (kind, row.status) {
        (_, JobStatus::Failed) => Some(Outcome::Failed),
        (JobKind::Ranking, JobStatus::Completed) => match row.result {
            ResultView::Ready(_) => Some(Outcome::Succeeded),
            ResultView::Unavailable(_) | ResultView::Loading | ResultView::NotRequested => None,
        },
        (JobKind::Billing, JobStatus::Completed) => match (&view.onboarding, view.navigation) {
            (OnboardingState::Completed, Some(Route::Dashboard)) => Some(Outcome::Succeeded),
            _ => None,
        },
        _ => None,
    }
}

/// The message sent when the user answers a retry prompt, if one is shown.
fn retry_msg(target: Option<&JobId>, view: &AppViewModel) -> Option<Msg> {
    if matches!(view.onboarding, OnboardingState::Failed(_)) {
        return Some(Msg::OnboardingRetryClicked);
    }
    let row = target.and_then(|id| view.job(id))?;
    if row.can_retry {
        return Some(Msg::RetryClicked {
            job_id: row.job_id.clone(),
        });
    }
    match row.result {
        ResultView::Unavailable(_) => Some(Msg::ResultRequested {
            job_id: row.job_id.clone(),
        }),
        _ => None,
    }
}

/// Forwards stdin lines to the event loop.
fn spawn_input_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
