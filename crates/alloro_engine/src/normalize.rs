//! Response normalization at the API boundary.
//!
//! The ranking endpoints mix camelCase and snake_case field names and
//! sometimes encode numbers as strings. Everything is folded into the
//! canonical `alloro_core` types here so nothing downstream has to care.

use std::collections::BTreeMap;

use alloro_core::{
    clamp_progress, Competitor, JobId, JobKind, JobSnapshot, JobStatus, RankingResult,
    StatusDetail,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone, Deserialize)]
pub struct BillingStatusWire {
    #[serde(alias = "has_stripe_subscription", default)]
    #[serde(rename = "hasStripeSubscription")]
    pub has_stripe_subscription: bool,
    #[serde(alias = "subscription_status", default)]
    #[serde(rename = "subscriptionStatus")]
    pub subscription_status: Option<String>,
}

pub fn normalize_ranking_status(job_id: &JobId, body: &Value) -> Result<JobSnapshot, ApiError> {
    let root = body
        .as_object()
        .ok_or_else(|| decode_error("status response is not an object"))?;
    // Some deployments wrap the payload as `{ "job": { ... } }`.
    let obj = match root.get("job").and_then(Value::as_object) {
        Some(inner) => inner,
        None => root,
    };

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .map(JobStatus::from_wire)
        .ok_or_else(|| decode_error("status response has no status field"))?;
    // A ranking job the server gave up on has failed; timeout is a
    // client-side billing state.
    let status = match status {
        JobStatus::Timeout => JobStatus::Failed,
        other => other,
    };

    let mut snapshot = JobSnapshot::new(job_id.clone(), JobKind::Ranking, status);
    snapshot.detail = field(obj, &["statusDetail", "status_detail"])
        .and_then(Value::as_object)
        .map(normalize_detail);
    snapshot.rank_score = number(obj, &["rankScore", "rank_score"]);
    snapshot.rank_position = integer(obj, &["rankPosition", "rank_position"]);
    snapshot.total_competitors = integer(obj, &["totalCompetitors", "total_competitors"]);
    Ok(snapshot)
}

fn normalize_detail(obj: &Map<String, Value>) -> StatusDetail {
    let steps_completed = field(obj, &["stepsCompleted", "steps_completed"])
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(|step| step.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default();

    let step_timestamps = field(obj, &["timestamps", "stepTimestamps", "step_timestamps"])
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(step, at)| scalar_text(at).map(|at| (step.clone(), at)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    StatusDetail {
        progress: number(obj, &["progress"]).map(clamp_progress),
        message: field(obj, &["message", "currentStep", "current_step"])
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        steps_completed,
        step_timestamps,
    }
}

pub fn normalize_ranking_result(job_id: &JobId, body: &Value) -> Result<RankingResult, ApiError> {
    let obj = body
        .get("ranking")
        .and_then(Value::as_object)
        .ok_or_else(|| decode_error("results response has no ranking object"))?;

    let competitors = field(obj, &["competitors", "competitorList", "competitor_list"])
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_object)
                .filter_map(normalize_competitor)
                .collect()
        })
        .unwrap_or_default();

    let analysis = field(obj, &["llmAnalysis", "llm_analysis", "analysis"]).and_then(|value| {
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map
                .get("summary")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .or_else(|| Some(value.to_string())),
            _ => None,
        }
    });

    Ok(RankingResult {
        job_id: job_id.clone(),
        practice_name: field(
            obj,
            &[
                "practiceName",
                "practice_name",
                "gbpLocationName",
                "gbp_location_name",
            ],
        )
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string(),
        location: field(obj, &["location", "marketLocation", "market_location"])
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        rank_score: number(obj, &["rankScore", "rank_score"]),
        rank_position: integer(obj, &["rankPosition", "rank_position"]),
        total_competitors: integer(obj, &["totalCompetitors", "total_competitors"]),
        competitors,
        analysis,
    })
}

fn normalize_competitor(obj: &Map<String, Value>) -> Option<Competitor> {
    let name = field(obj, &["name", "businessName", "business_name"])?.as_str()?;
    Some(Competitor {
        name: name.to_string(),
        score: number(obj, &["score", "rankScore", "rank_score"]),
        position: integer(obj, &["position", "rankPosition", "rank_position"]),
        review_count: integer(obj, &["reviewCount", "review_count", "totalReviews"]),
        rating: number(obj, &["rating", "averageRating", "average_rating"]),
    })
}

pub fn normalize_billing_status(job_id: &JobId, wire: &BillingStatusWire) -> JobSnapshot {
    let subscription = wire
        .subscription_status
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let status = if wire.has_stripe_subscription
        || matches!(subscription.as_str(), "active" | "trialing")
    {
        JobStatus::Completed
    } else if matches!(subscription.as_str(), "canceled" | "incomplete_expired") {
        JobStatus::Failed
    } else {
        JobStatus::Processing
    };
    JobSnapshot::new(job_id.clone(), JobKind::Billing, status)
}

/// Accepts integer and string job ids (`42` or `"42"`).
pub fn normalize_job_id(value: &Value) -> Option<JobId> {
    match value {
        Value::Number(n) => n.as_u64().map(JobId::from),
        Value::String(s) if !s.trim().is_empty() => Some(JobId::from(s.trim())),
        _ => None,
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

fn number(obj: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    match field(obj, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn integer(obj: &Map<String, Value>, names: &[&str]) -> Option<u32> {
    number(obj, names)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_error(message: &str) -> ApiError {
    ApiError::new(FailureKind::Decode, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn id() -> JobId {
        JobId::from(42u64)
    }

    #[test]
    fn camel_and_snake_status_payloads_normalize_identically() {
        let camel = json!({
            "status": "processing",
            "statusDetail": {
                "progress": 40,
                "message": "Fetching competitors",
                "stepsCompleted": ["queued", "gbp"],
                "timestamps": { "queued": "2024-05-01T10:00:00Z" }
            },
            "rankScore": null,
            "totalCompetitors": "12"
        });
        let snake = json!({
            "status": "processing",
            "status_detail": {
                "progress": "40",
                "message": "Fetching competitors",
                "steps_completed": ["queued", "gbp"],
                "step_timestamps": { "queued": "2024-05-01T10:00:00Z" }
            },
            "total_competitors": 12
        });

        let a = normalize_ranking_status(&id(), &camel).unwrap();
        let b = normalize_ranking_status(&id(), &snake).unwrap();
        assert_eq!(a, b);
        let detail = a.detail.unwrap();
        assert_eq!(detail.progress, Some(40));
        assert_eq!(detail.steps_completed, vec!["queued", "gbp"]);
        assert_eq!(a.total_competitors, Some(12));
        assert_eq!(a.rank_score, None);
    }

    #[test]
    fn completed_status_carries_score() {
        let body = json!({ "status": "completed", "rankScore": 82, "rankPosition": 2 });
        let snapshot = normalize_ranking_status(&id(), &body).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.rank_score, Some(82.0));
        assert_eq!(snapshot.rank_position, Some(2));
        assert!(snapshot.detail.is_none());
    }

    #[test]
    fn wrapped_job_payload_is_unwrapped() {
        let body = json!({ "success": true, "job": { "status": "failed" } });
        let snapshot = normalize_ranking_status(&id(), &body).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
    }

    #[test]
    fn server_timeout_on_ranking_job_is_a_failure() {
        let snapshot = normalize_ranking_status(&id(), &json!({ "status": "timeout" })).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
    }

    #[test]
    fn missing_status_is_a_decode_error() {
        let err = normalize_ranking_status(&id(), &json!({ "progress": 3 })).unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
        let err = normalize_ranking_status(&id(), &json!([1, 2])).unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
    }

    #[test]
    fn ranking_result_normalizes_competitors_and_analysis() {
        let body = json!({
            "ranking": {
                "gbp_location_name": "Bright Smiles",
                "rankScore": "82.5",
                "rank_position": 2,
                "totalCompetitors": 9,
                "competitors": [
                    { "name": "Lone Star Braces", "score": 88, "reviewCount": 412, "rating": 4.9 },
                    { "score": 10 }
                ],
                "llmAnalysis": { "summary": "Strong review velocity." }
            }
        });
        let result = normalize_ranking_result(&id(), &body).unwrap();
        assert_eq!(result.practice_name, "Bright Smiles");
        assert_eq!(result.rank_score, Some(82.5));
        assert_eq!(result.competitors.len(), 1);
        assert_eq!(result.competitors[0].review_count, Some(412));
        assert_eq!(result.analysis.as_deref(), Some("Strong review velocity."));
    }

    #[test]
    fn billing_status_mapping() {
        let active = BillingStatusWire {
            has_stripe_subscription: true,
            subscription_status: None,
        };
        let trialing = BillingStatusWire {
            has_stripe_subscription: false,
            subscription_status: Some("trialing".into()),
        };
        let canceled = BillingStatusWire {
            has_stripe_subscription: false,
            subscription_status: Some("canceled".into()),
        };
        let inactive = BillingStatusWire {
            has_stripe_subscription: false,
            subscription_status: Some("inactive".into()),
        };
        let job = JobId::from("cs_1");
        assert_eq!(normalize_billing_status(&job, &active).status, JobStatus::Completed);
        assert_eq!(normalize_billing_status(&job, &trialing).status, JobStatus::Completed);
        assert_eq!(normalize_billing_status(&job, &canceled).status, JobStatus::Failed);
        assert_eq!(normalize_billing_status(&job, &inactive).status, JobStatus::Processing);
    }

    #[test]
    fn job_ids_accept_numbers_and_strings() {
        assert_eq!(normalize_job_id(&json!(42)), Some(id()));
        assert_eq!(normalize_job_id(&json!(" 42 ")), Some(id()));
        assert_eq!(normalize_job_id(&json!(null)), None);
        assert_eq!(normalize_job_id(&json!(-1)), None);
    }
}
