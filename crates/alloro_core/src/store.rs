use std::collections::BTreeMap;

use crate::{JobId, JobSnapshot, JobStatus};

/// Latest status snapshot per job. No history is kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStateStore {
    jobs: BTreeMap<JobId, JobSnapshot>,
}

impl JobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins. Returns `true` when the stored snapshot changed.
    ///
    /// A job that already reached a terminal state is frozen; only
    /// [`JobStateStore::reopen`] can move a timed-out job back into play.
    pub fn apply(&mut self, snapshot: JobSnapshot) -> bool {
        match self.jobs.get(&snapshot.id) {
            Some(current) if current.is_terminal() => false,
            Some(current) if *current == snapshot => false,
            _ => {
                self.jobs.insert(snapshot.id.clone(), snapshot);
                true
            }
        }
    }

    /// Marks a job as timed out unless it already finished.
    pub fn mark_timeout(&mut self, id: &JobId) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.is_terminal() => {
                job.status = JobStatus::Timeout;
                true
            }
            _ => false,
        }
    }

    /// `Timeout` -> `Processing`. Any other state is left alone.
    pub fn reopen(&mut self, id: &JobId) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Timeout => {
                job.status = JobStatus::Processing;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &JobId) -> Option<&JobSnapshot> {
        self.jobs.get(id)
    }

    pub fn remove(&mut self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.remove(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobSnapshot> {
        self.jobs.values()
    }
}
