use alloro_core::{JobId, JobKind, JobStatus};
use alloro_engine::{
    AlloroApi, ApiSettings, FailureKind, RankingRequest, ReqwestApi, Role, SessionContext,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer, session: SessionContext) -> ReqwestApi {
    let settings = ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    };
    ReqwestApi::new(&settings, session).expect("client")
}

fn admin_session() -> SessionContext {
    SessionContext::new(
        Some("secret".to_string()),
        Some(Role::Admin),
        Some("acct-9".to_string()),
    )
}

#[tokio::test]
async fn status_request_sends_session_headers_and_normalizes_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/practice-ranking/status/42"))
        .and(header("authorization", "Bearer secret"))
        .and(header("x-account-id", "acct-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "status_detail": { "progress": 40, "message": "Fetching competitors" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server, admin_session());
    let snapshot = api.ranking_status(&JobId::from(42u64)).await.expect("status");
    assert_eq!(snapshot.kind, JobKind::Ranking);
    assert_eq!(snapshot.status, JobStatus::Processing);
    let detail = snapshot.detail.expect("detail");
    assert_eq!(detail.progress, Some(40));
    assert_eq!(detail.message.as_deref(), Some("Fetching competitors"));
}

#[tokio::test]
async fn job_ids_with_reserved_characters_stay_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/practice-ranking/results/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "completed" })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/admin/practice-ranking/status/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "processing" })))
        .expect(2)
        .mount(&server)
        .await;

    let api = api_for(&server, admin_session());
    for raw in ["../results/7", "a?b#c"] {
        let snapshot = api
            .ranking_status(&JobId::from(raw))
            .await
            .expect("status");
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.id, JobId::from(raw));
    }
}

#[tokio::test]
async fn dot_and_blank_job_ids_are_refused_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = api_for(&server, admin_session());
    for raw in ["..", ".", " "] {
        let err = api.ranking_results(&JobId::from(raw)).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}

#[tokio::test]
async fn trigger_posts_practice_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/practice-ranking/trigger"))
        .and(body_json(json!({ "practiceName": "Bright Smiles", "location": "Austin, TX" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "jobId": 42 })),
        )
        .mount(&server)
        .await;

    let api = api_for(&server, admin_session());
    let job_id = api
        .trigger_ranking(&RankingRequest {
            practice_name: "Bright Smiles".to_string(),
            location: Some("Austin, TX".to_string()),
        })
        .await
        .expect("trigger");
    assert_eq!(job_id, JobId::from(42u64));
}

#[tokio::test]
async fn trigger_refused_by_server_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/practice-ranking/trigger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "An analysis is already running"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server, admin_session());
    let err = api
        .trigger_ranking(&RankingRequest {
            practice_name: "Bright Smiles".to_string(),
            location: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
    assert_eq!(err.message, "An analysis is already running");
}

#[tokio::test]
async fn non_admin_trigger_is_refused_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = SessionContext::new(Some("t".to_string()), Some(Role::User), None);
    let api = api_for(&server, session);
    let err = api
        .trigger_ranking(&RankingRequest {
            practice_name: "Bright Smiles".to_string(),
            location: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Forbidden);
}

#[tokio::test]
async fn http_errors_carry_status_and_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/practice-ranking/results/42"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({ "error": "upstream unavailable" })),
        )
        .mount(&server)
        .await;

    let api = api_for(&server, SessionContext::default());
    let err = api.ranking_results(&JobId::from(42u64)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert_eq!(err.message, "upstream unavailable");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/practice-ranking/status/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let api = api_for(&server, SessionContext::default());
    let err = api.ranking_status(&JobId::from(7u64)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn billing_status_maps_subscription_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/billing/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hasStripeSubscription": false,
            "subscriptionStatus": "incomplete"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server, SessionContext::default());
    let snapshot = api
        .billing_status(&JobId::from("cs_test_1"))
        .await
        .expect("billing");
    assert_eq!(snapshot.id, JobId::from("cs_test_1"));
    assert_eq!(snapshot.kind, JobKind::Billing);
    assert_eq!(snapshot.status, JobStatus::Processing);
}

#[tokio::test]
async fn complete_onboarding_reports_success_and_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onboarding/completeOnboarding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Welcome aboard"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/onboarding/completeOnboarding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let api = api_for(&server, SessionContext::default());
    assert_eq!(
        api.complete_onboarding().await.expect("first call"),
        Some("Welcome aboard".to_string())
    );
    let err = api.complete_onboarding().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
}

#[test]
fn invalid_base_url_is_reported() {
    let settings = ApiSettings {
        base_url: "not a url".to_string(),
        ..ApiSettings::default()
    };
    let err = ReqwestApi::new(&settings, SessionContext::default())
        .err()
        .expect("invalid url");
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
