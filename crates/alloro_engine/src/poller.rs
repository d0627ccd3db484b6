//! Fixed-interval status polling for server-side jobs.
//!
//! A [`StatusPoller`] calls a status-fetch function until the job reports a
//! terminal status, the attempt budget runs out or its
//! [`CancellationToken`] fires. [`PollRegistry`] keeps at most one live
//! poll per job id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloro_core::{JobId, JobSnapshot};
use alloro_logging::{alloro_debug, alloro_info};
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ApiError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const BILLING_MAX_ATTEMPTS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until a terminal status or cancellation.
    pub max_attempts: Option<u32>,
}

impl PollSettings {
    pub fn ranking() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }

    pub fn billing() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: Some(BILLING_MAX_ATTEMPTS),
        }
    }
}

/// Async status lookup for one job id.
pub type StatusFetch =
    Arc<dyn Fn(JobId) -> BoxFuture<'static, Result<JobSnapshot, ApiError>> + Send + Sync>;

/// Receives every non-terminal snapshot observed by a poll loop.
pub trait StatusSink: Send + Sync {
    fn emit(&self, snapshot: JobSnapshot);
}

impl StatusSink for mpsc::UnboundedSender<JobSnapshot> {
    fn emit(&self, snapshot: JobSnapshot) {
        let _ = self.send(snapshot);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Terminal(JobSnapshot),
    TimedOut { attempts: u32 },
    Cancelled,
}

pub struct StatusPoller {
    job_id: JobId,
    settings: PollSettings,
    fetch: StatusFetch,
}

impl StatusPoller {
    pub fn new(job_id: JobId, settings: PollSettings, fetch: StatusFetch) -> Self {
        Self {
            job_id,
            settings,
            fetch,
        }
    }

    /// Runs the loop to completion. Nothing is emitted once `cancel` fires,
    /// and the terminal snapshot is returned rather than emitted.
    pub async fn run(&self, cancel: &CancellationToken, sink: &dyn StatusSink) -> PollOutcome {
        let mut attempts: u32 = 0;
        loop {
            if self.budget_spent(attempts) {
                alloro_info!(
                    "Poll for job {} timed out after {} attempts",
                    self.job_id,
                    attempts
                );
                return PollOutcome::TimedOut { attempts };
            }
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts),
                result = (self.fetch)(self.job_id.clone()) => result,
            };
            if cancel.is_cancelled() {
                return self.cancelled(attempts);
            }

            match result {
                Ok(snapshot) if snapshot.is_terminal() => {
                    alloro_info!(
                        "Job {} reached {} after {} attempts",
                        self.job_id,
                        snapshot.status,
                        attempts
                    );
                    return PollOutcome::Terminal(snapshot);
                }
                Ok(snapshot) => {
                    alloro_debug!(
                        "Job {} attempt {}: {}",
                        self.job_id,
                        attempts,
                        snapshot.status
                    );
                    sink.emit(snapshot);
                }
                Err(err) => {
                    // Transient; the next tick tries again.
                    alloro_debug!("Job {} attempt {} failed: {}", self.job_id, attempts, err);
                }
            }

            if self.budget_spent(attempts) {
                continue;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    /// Starts the loop on the current tokio runtime.
    pub fn spawn(self) -> PollHandle {
        let cancel = CancellationToken::new();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let job_id = self.job_id.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = self.run(&task_cancel, &update_tx).await;
            let _ = outcome_tx.send(outcome);
        });
        PollHandle {
            job_id,
            cancel,
            updates: update_rx,
            outcome: outcome_rx,
            task,
        }
    }

    fn budget_spent(&self, attempts: u32) -> bool {
        self.settings
            .max_attempts
            .is_some_and(|max| attempts >= max)
    }

    fn cancelled(&self, attempts: u32) -> PollOutcome {
        alloro_debug!("Poll for job {} cancelled at attempt {}", self.job_id, attempts);
        PollOutcome::Cancelled
    }
}

/// One immediate status check, used when the user retries a timed-out job.
pub async fn check_once(fetch: &StatusFetch, job_id: &JobId) -> Result<JobSnapshot, ApiError> {
    fetch(job_id.clone()).await
}

/// Owner side of a spawned [`StatusPoller`].
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    updates: mpsc::UnboundedReceiver<JobSnapshot>,
    outcome: oneshot::Receiver<PollOutcome>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Next non-terminal snapshot; `None` once the loop has ended.
    pub async fn next_update(&mut self) -> Option<JobSnapshot> {
        self.updates.recv().await
    }

    pub async fn outcome(mut self) -> PollOutcome {
        (&mut self.outcome).await.unwrap_or(PollOutcome::Cancelled)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Proof of registration for one poll loop.
#[derive(Debug, Clone)]
pub struct PollTicket {
    pub job_id: JobId,
    pub cancel: CancellationToken,
    generation: u64,
}

struct RegistryEntry {
    generation: u64,
    cancel: CancellationToken,
}

/// At most one active poll per job id.
#[derive(Default)]
pub struct PollRegistry {
    entries: Mutex<HashMap<JobId, RegistryEntry>>,
    next_generation: AtomicU64,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if a poll for `job_id` is already running.
    pub fn try_register(&self, job_id: &JobId) -> Option<PollTicket> {
        let mut entries = self.lock();
        if entries.contains_key(job_id) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        entries.insert(
            job_id.clone(),
            RegistryEntry {
                generation,
                cancel: cancel.clone(),
            },
        );
        Some(PollTicket {
            job_id: job_id.clone(),
            cancel,
            generation,
        })
    }

    /// Cancels and forgets the poll for `job_id`. Idempotent.
    pub fn stop(&self, job_id: &JobId) -> bool {
        match self.lock().remove(job_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        for (_, entry) in self.lock().drain() {
            entry.cancel.cancel();
        }
    }

    /// Releases the entry held by `ticket`; a newer registration for the
    /// same job is left alone.
    pub fn finish(&self, ticket: &PollTicket) -> bool {
        let mut entries = self.lock();
        match entries.get(&ticket.job_id) {
            Some(entry) if entry.generation == ticket.generation => {
                entries.remove(&ticket.job_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.lock().contains_key(job_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, RegistryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
