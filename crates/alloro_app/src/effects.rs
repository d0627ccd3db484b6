use std::time::Duration;

use alloro_core::{Effect, Msg};
use alloro_engine::{EngineEvent, EngineHandle};
use alloro_logging::{alloro_debug, alloro_info, alloro_warn};

/// Executes the effects returned by `update` against the engine and turns
/// engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::TriggerRanking {
                    practice_name,
                    location,
                } => {
                    alloro_info!("TriggerRanking practice={:?}", practice_name);
                    self.engine.trigger_ranking(practice_name, location);
                }
                Effect::StartPolling { job_id, kind } => {
                    self.engine.start_polling(job_id, kind);
                }
                Effect::StopPolling { job_id } => {
                    alloro_debug!("StopPolling job_id={}", job_id);
                    self.engine.stop_polling(job_id);
                }
                Effect::RetryCheck { job_id, kind } => {
                    alloro_info!("RetryCheck job_id={}", job_id);
                    self.engine.retry_check(job_id, kind);
                }
                Effect::FetchResult { job_id } => {
                    self.engine.fetch_result(job_id);
                }
                Effect::CompleteOnboarding => {
                    self.engine.complete_onboarding();
                }
            }
        }
    }

    /// Waits up to `timeout` for the next event, then drains whatever else
    /// is already queued.
    pub fn drain(&self, timeout: Duration) -> Vec<Msg> {
        let mut msgs = Vec::new();
        if let Some(event) = self.engine.recv_timeout(timeout) {
            msgs.push(to_msg(event));
            while let Some(event) = self.engine.try_recv() {
                msgs.push(to_msg(event));
            }
        }
        msgs
    }
}

pub(crate) fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::RankingTriggered { job_id } => Msg::RankingTriggered { job_id },
        EngineEvent::TriggerFailed { error } => Msg::TriggerFailed {
            message: error.message,
        },
        EngineEvent::Status(snapshot) => Msg::StatusUpdated(snapshot),
        EngineEvent::PollTimedOut {
            job_id, attempts, ..
        } => Msg::PollTimedOut { job_id, attempts },
        EngineEvent::ResultFetched { job_id, result } => match result {
            Ok(ranking) => Msg::ResultLoaded(ranking),
            Err(err) => Msg::ResultUnavailable {
                job_id,
                message: err.to_string(),
            },
        },
        EngineEvent::OnboardingFinished { result } => match result {
            Ok(message) => {
                if let Some(message) = message {
                    alloro_info!("Onboarding completed: {}", message);
                }
                Msg::OnboardingCompleted
            }
            Err(err) => {
                alloro_warn!("Onboarding failed: {}", err);
                Msg::OnboardingFailed {
                    message: format!("Could not finish onboarding: {}", err.message),
                }
            }
        },
    }
}
