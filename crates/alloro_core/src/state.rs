use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, JobRowView};
use crate::{JobId, JobKind, JobSnapshot, JobStateStore, RankingResult};

/// Lifecycle of the full result payload of a completed ranking job.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    Loading,
    Ready(RankingResult),
    /// The job succeeded but retrieving its output failed.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OnboardingState {
    #[default]
    Idle,
    Completing,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Toast-style message shown once to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    store: JobStateStore,
    results: BTreeMap<JobId, ResultState>,
    onboarding: OnboardingState,
    navigation: Option<Route>,
    notice: Option<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let jobs: Vec<JobRowView> = self
            .store
            .iter()
            .map(|job| JobRowView::build(job, self.results.get(&job.id)))
            .collect();
        AppViewModel {
            job_count: jobs.len(),
            jobs,
            onboarding: self.onboarding.clone(),
            navigation: self.navigation,
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn store(&self) -> &JobStateStore {
        &self.store
    }

    pub fn job(&self, id: &JobId) -> Option<&JobSnapshot> {
        self.store.get(id)
    }

    pub fn result(&self, id: &JobId) -> Option<&ResultState> {
        self.results.get(id)
    }

    pub fn is_watching(&self, id: &JobId) -> bool {
        self.store.get(id).is_some()
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Starts tracking a job. Returns `false` if it is already tracked.
    pub(crate) fn watch(&mut self, id: JobId, kind: JobKind) -> bool {
        if self.is_watching(&id) {
            return false;
        }
        self.store.apply(JobSnapshot::pending(id, kind));
        self.mark_dirty();
        true
    }

    pub(crate) fn unwatch(&mut self, id: &JobId) -> bool {
        let removed = self.store.remove(id).is_some();
        self.results.remove(id);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn store_mut(&mut self) -> &mut JobStateStore {
        &mut self.store
    }

    pub(crate) fn set_result(&mut self, id: JobId, result: ResultState) {
        self.results.insert(id, result);
        self.mark_dirty();
    }

    pub(crate) fn onboarding(&self) -> &OnboardingState {
        &self.onboarding
    }

    pub(crate) fn set_onboarding(&mut self, onboarding: OnboardingState) {
        self.onboarding = onboarding;
        self.mark_dirty();
    }

    pub(crate) fn navigate(&mut self, route: Route) {
        self.navigation = Some(route);
        self.mark_dirty();
    }

    pub(crate) fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
        self.mark_dirty();
    }
}
