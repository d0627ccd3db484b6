//! REST client for the Alloro endpoints consumed by the job tracker.
//!
//! The server owns every job; this client only triggers, inspects and
//! fetches them. Responses are normalized into `alloro_core` types before
//! they leave this module.

use std::time::Duration;

use alloro_core::{JobId, JobSnapshot, RankingResult};
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{
    normalize_billing_status, normalize_job_id, normalize_ranking_result,
    normalize_ranking_status, BillingStatusWire,
};
use crate::{ApiError, FailureKind, SessionContext};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRequest {
    pub practice_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[async_trait::async_trait]
pub trait AlloroApi: Send + Sync {
    async fn trigger_ranking(&self, request: &RankingRequest) -> Result<JobId, ApiError>;

    async fn ranking_status(&self, job_id: &JobId) -> Result<JobSnapshot, ApiError>;

    async fn ranking_results(&self, job_id: &JobId) -> Result<RankingResult, ApiError>;

    /// Subscription state after checkout; `job_id` only tags the snapshot.
    async fn billing_status(&self, job_id: &JobId) -> Result<JobSnapshot, ApiError>;

    /// Returns the server's message, if any.
    async fn complete_onboarding(&self) -> Result<Option<String>, ApiError>;
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(rename = "jobId", alias = "job_id", alias = "id", default)]
    job_id: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OnboardingResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

pub struct ReqwestApi {
    client: reqwest::Client,
    base_url: url::Url,
    session: SessionContext,
}

impl ReqwestApi {
    pub fn new(settings: &ApiSettings, session: SessionContext) -> Result<Self, ApiError> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = url::Url::parse(&base)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// `path` followed by `job_id` as a single percent-encoded segment.
    fn job_endpoint(&self, path: &str, job_id: &JobId) -> Result<url::Url, ApiError> {
        let raw = job_id.as_str().trim();
        if raw.is_empty() || raw == "." || raw == ".." {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("invalid job id {raw:?}"),
            ));
        }
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "base url cannot hold a path"))?
            .pop_if_empty()
            .push(job_id.as_str());
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        Ok(self.request_url(method, url))
    }

    fn request_url(&self, method: Method, url: url::Url) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.session.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(account_id) = &self.session.account_id {
            builder = builder.header("x-account-id", account_id);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                server_message(&body).unwrap_or_else(|| status.to_string()),
            ));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl AlloroApi for ReqwestApi {
    async fn trigger_ranking(&self, request: &RankingRequest) -> Result<JobId, ApiError> {
        self.session.ensure_admin()?;
        let builder = self
            .request(Method::POST, "api/admin/practice-ranking/trigger")?
            .json(request);
        let response: TriggerResponse = self.send(builder).await?;
        if !response.success {
            return Err(ApiError::new(
                FailureKind::Rejected,
                response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "ranking trigger refused".to_string()),
            ));
        }
        response
            .job_id
            .as_ref()
            .and_then(normalize_job_id)
            .ok_or_else(|| ApiError::new(FailureKind::Decode, "trigger response has no job id"))
    }

    async fn ranking_status(&self, job_id: &JobId) -> Result<JobSnapshot, ApiError> {
        let url = self.job_endpoint("api/admin/practice-ranking/status", job_id)?;
        let body: Value = self.send(self.request_url(Method::GET, url)).await?;
        normalize_ranking_status(job_id, &body)
    }

    async fn ranking_results(&self, job_id: &JobId) -> Result<RankingResult, ApiError> {
        let url = self.job_endpoint("api/admin/practice-ranking/results", job_id)?;
        let body: Value = self.send(self.request_url(Method::GET, url)).await?;
        normalize_ranking_result(job_id, &body)
    }

    async fn billing_status(&self, job_id: &JobId) -> Result<JobSnapshot, ApiError> {
        let wire: BillingStatusWire = self
            .send(self.request(Method::GET, "api/billing/status")?)
            .await?;
        Ok(normalize_billing_status(job_id, &wire))
    }

    async fn complete_onboarding(&self) -> Result<Option<String>, ApiError> {
        let builder = self
            .request(Method::POST, "onboarding/completeOnboarding")?
            .json(&serde_json::json!({}));
        let response: OnboardingResponse = self.send(builder).await?;
        if response.success {
            Ok(response.message)
        } else {
            Err(ApiError::new(
                FailureKind::Rejected,
                response
                    .message
                    .unwrap_or_else(|| "onboarding could not be completed".to_string()),
            ))
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
