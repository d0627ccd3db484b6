use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloro_core::{JobId, RankingResult};
use alloro_logging::{alloro_debug, alloro_warn};
use tokio::sync::OnceCell;

use crate::{AlloroApi, ApiError};

type ResultCell = Arc<OnceCell<RankingResult>>;

/// Fetches the full result of a completed ranking job at most once per id.
///
/// Concurrent first requests for the same id share one network call. A
/// failed fetch leaves the slot empty so a later request can try again.
pub struct ResultFetcher<A: AlloroApi + ?Sized> {
    api: Arc<A>,
    cache: Mutex<HashMap<JobId, ResultCell>>,
}

impl<A: AlloroApi + ?Sized> ResultFetcher<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn fetch(&self, job_id: &JobId) -> Result<RankingResult, ApiError> {
        let cell = self.lock().entry(job_id.clone()).or_default().clone();
        if let Some(cached) = cell.get() {
            alloro_debug!("Results for job {} served from cache", job_id);
            return Ok(cached.clone());
        }
        let result = cell
            .get_or_try_init(|| async {
                alloro_debug!("Fetching results for job {}", job_id);
                self.api.ranking_results(job_id).await
            })
            .await;
        match result {
            Ok(ranking) => Ok(ranking.clone()),
            Err(err) => {
                alloro_warn!("Results for job {} unavailable: {}", job_id, err);
                Err(err)
            }
        }
    }

    pub fn cached(&self, job_id: &JobId) -> Option<RankingResult> {
        self.lock()
            .get(job_id)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn invalidate(&self, job_id: &JobId) {
        self.lock().remove(job_id);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, ResultCell>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
