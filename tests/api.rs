mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use specdoc::infra::http::{ApiRateLimiter, ApiState, REQUEST_ID_HEADER, build_router};

use specdoc::application::repos::JobStore;
use specdoc::domain::entities::{JobProgress, JobRecord, QualityMetrics};
use specdoc::domain::types::{JobStatus, OutputFormat, SpecFormat};
use time::OffsetDateTime;
use uuid::Uuid;

use common::{Harness, ScriptedGenAi, instant_retry, openapi_spec};

const BASE: &str = "https://docs.example.com";

fn app_with_limit(harness: &Harness, max_requests: u32) -> Router {
    let limiter = Arc::new(ApiRateLimiter::new(Duration::from_secs(60), max_requests));
    let state = ApiState::new(harness.service.clone(), limiter, Some(BASE));
    build_router(state, 1 << 20)
}

fn app(harness: &Harness) -> Router {
    app_with_limit(harness, 1_000)
}

fn harness() -> Harness {
    Harness::new(Arc::new(ScriptedGenAi::succeeding()), instant_retry(3))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request(method, uri, body))
        .await
        .expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

fn submission(team_id: &str, formats: &[&str]) -> Value {
    json!({
        "specification": openapi_spec(),
        "output_formats": formats,
        "team_id": team_id,
        "service_name": "ledger",
    })
}

async fn submit(app: &Router, team_id: &str, formats: &[&str]) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/jobs",
        Some(submission(team_id, formats)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    body["job_id"].as_str().expect("job id").to_string()
}

#[tokio::test]
async fn submission_is_accepted_with_links() {
    let harness = harness();
    let app = app(&harness);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(submission("payments", &["markdown", "html"])),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let id = body["job_id"].as_str().expect("job id");
    assert_eq!(body["links"]["status"], format!("{BASE}/api/v1/jobs/{id}"));
    assert_eq!(
        body["links"]["downloads"]["html"],
        format!("{BASE}/api/v1/jobs/{id}/download/html")
    );
    assert_eq!(harness.drain_job_ids().await.len(), 1);

    let (status, view) = send(&app, Method::GET, &format!("/api/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "queued");
    assert_eq!(view["spec_format"], "openapi");
    assert!(view["estimated_completion"].is_string());
    assert!(view.get("specification").is_none());
}

#[tokio::test]
async fn invalid_specification_is_rejected_before_queueing() {
    let harness = harness();
    let app = app(&harness);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(json!({
            "specification": {"hello": "world"},
            "team_id": "payments",
            "service_name": "ledger",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(json!({"specification": openapi_spec(), "team_id": "payments"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (_, history) = send(&app, Method::GET, "/api/v1/jobs", None).await;
    assert_eq!(history["count"], 0);
    assert!(harness.drain_job_ids().await.is_empty());
}

#[tokio::test]
async fn job_ids_are_validated() {
    let harness = harness();
    let app = app(&harness);

    let (status, body) = send(&app, Method::GET, "/api/v1/jobs/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let unknown = uuid::Uuid::new_v4();
    let (status, body) = send(&app, Method::GET, &format!("/api/v1/jobs/{unknown}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/jobs/{unknown}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn downloads_wait_for_completion() {
    let harness = harness();
    let app = app(&harness);
    let id = submit(&app, "payments", &["markdown"]).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/jobs/{id}/download/markdown"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_state");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/jobs/{id}/download/docx"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "unsupported_format");

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/jobs/{id}/quality"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completed_job_serves_artifacts_and_quality() {
    let harness = harness();
    let app = app(&harness);
    let id = submit(&app, "payments", &["markdown"]).await;

    for job_id in harness.drain_job_ids().await {
        harness.executor.execute(job_id).await.expect("execute");
    }

    let (status, view) = send(&app, Method::GET, &format!("/api/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "completed");
    assert_eq!(view["progress"]["percentage"], 100);
    assert!(view["completed_at"].is_string());
    assert_eq!(view["estimated_completion"], view["completed_at"]);
    assert_eq!(
        view["results"]["markdown"]["download_url"],
        format!("{BASE}/api/v1/jobs/{id}/download/markdown")
    );
    assert!(view["results"]["markdown"].get("content").is_none());

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/jobs/{id}/download/markdown"),
            None,
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/markdown"));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"ledger.md\"");
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(text.starts_with("# ledger API Documentation"));

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/jobs/{id}/download/html"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, quality) =
        send(&app, Method::GET, &format!("/api/v1/jobs/{id}/quality"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(quality["overall_score"].is_u64());
    assert!(quality["suggestions"].is_array());
}

#[tokio::test]
async fn cancelling_twice_reports_the_terminal_state() {
    let harness = harness();
    let app = app(&harness);
    let id = submit(&app, "payments", &[]).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn history_filters_and_statistics() {
    let harness = harness();
    let app = app(&harness);
    submit(&app, "payments", &[]).await;
    submit(&app, "payments", &[]).await;
    let other = submit(&app, "search", &[]).await;
    send(&app, Method::DELETE, &format!("/api/v1/jobs/{other}"), None).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/jobs?team_id=payments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, Method::GET, "/api/v1/jobs?status=cancelled", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["job_id"], other.as_str());

    let (_, body) = send(&app, Method::GET, "/api/v1/jobs?limit=1", None).await;
    assert_eq!(body["count"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/jobs?created_after=yesterday",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (_, active) = send(&app, Method::GET, "/api/v1/jobs/active", None).await;
    assert_eq!(active["count"], 2);

    let (status, stats) = send(&app, Method::GET, "/api/v1/jobs/stats?days=30", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_jobs"], 3);
    assert_eq!(stats["period_days"], 30);

    let (status, _) = send(&app, Method::GET, "/api/v1/jobs/stats?days=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, queue) = send(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["queued_jobs"], 2);
    assert_eq!(queue["processing_jobs"], 0);
    assert_eq!(queue["max_concurrent_jobs"], 2);
}

#[tokio::test]
async fn clients_over_the_limit_are_throttled() {
    let harness = harness();
    let app = app_with_limit(&harness, 2);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/queue", None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
    }

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/v1/queue", None))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Liveness sits outside the API limiter.
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn health_endpoints_report_store_state() {
    let harness = harness();
    let app = app(&harness);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(REQUEST_ID_HEADER, "req-1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some("req-1")
    );

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["store_healthy"], true);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let harness = harness();
    let limiter = Arc::new(ApiRateLimiter::new(Duration::from_secs(60), 100));
    let state = ApiState::new(harness.service.clone(), limiter, Some(BASE));
    let app = build_router(state, 256);

    let mut body = submission("payments", &[]);
    body["specification"]["info"]["description"] = Value::String("x".repeat(1024));
    let (status, body) = send(&app, Method::POST, "/api/v1/jobs", Some(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");
}

fn scored_record(team_id: &str, service_name: &str, score: u8) -> JobRecord {
    let now = OffsetDateTime::now_utc();
    JobRecord {
        id: Uuid::new_v4(),
        team_id: team_id.into(),
        service_name: service_name.into(),
        spec_format: SpecFormat::OpenApi,
        specification: openapi_spec(),
        specification_hash: String::new(),
        source_url: None,
        output_formats: vec![OutputFormat::Markdown],
        status: JobStatus::Completed,
        progress: JobProgress::finished("Completed", 5),
        cancel_requested: false,
        results: Default::default(),
        quality: Some(QualityMetrics::new(score, score, score, Vec::new())),
        failure: None,
        created_at: now,
        started_at: Some(now),
        completed_at: Some(now),
        updated_at: now,
    }
}

#[tokio::test]
async fn leaderboard_ranks_teams_and_lists_poor_services() {
    let harness = harness();
    for record in [
        scored_record("identity", "login", 92),
        scored_record("payments-core", "ledger", 74),
        scored_record("payments-core", "billing", 40),
    ] {
        harness.store.insert_job(&record).await.expect("insert");
    }
    let app = app(&harness);

    let (status, board) = send(&app, Method::GET, "/api/v1/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["rankings"][0]["team_id"], "identity");
    assert_eq!(board["rankings"][0]["rank"], 1);
    assert_eq!(board["rankings"][1]["team_name"], "Payments Core Team");
    assert_eq!(board["rankings"][1]["average_score"], 57.0);
    assert_eq!(board["poor_quality_services"][0]["service_name"], "billing");
    assert_eq!(board["filters_applied"]["time_period"], "month");
    assert_eq!(board["filters_applied"]["poor_quality_threshold"], 60);

    let (status, standing) = send(
        &app,
        Method::GET,
        "/api/v1/leaderboard/teams/payments-core?time_period=week",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standing["ranking"]["rank"], 2);
    assert_eq!(standing["teams_ranked"], 2);
    assert_eq!(standing["time_period"], "week");

    let (status, body) = send(&app, Method::GET, "/api/v1/leaderboard/teams/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/leaderboard?poor_quality_threshold=101",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/v1/leaderboard?time_period=decade", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quality_alerts_and_monitoring_flag_weak_documentation() {
    let harness = harness();
    for record in [
        scored_record("search", "index", 22),
        scored_record("identity", "login", 55),
        scored_record("identity", "profile", 91),
    ] {
        harness.store.insert_job(&record).await.expect("insert");
    }
    let app = app(&harness);

    let (status, alerts) = send(&app, Method::GET, "/api/v1/quality/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().expect("alert list");
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["severity"], "critical");
    assert_eq!(alerts[0]["alert_id"], "search-index-critical");
    assert_eq!(alerts[1]["severity"], "medium");

    let (_, filtered) = send(
        &app,
        Method::GET,
        "/api/v1/quality/alerts?team_id=identity&severity=medium",
        None,
    )
    .await;
    assert_eq!(filtered.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::GET, "/api/v1/quality/alerts?severity=dire", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = send(&app, Method::GET, "/api/v1/quality/monitoring", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["period_days"], 1);
    assert_eq!(report["services_monitored"], 3);
    assert_eq!(report["poor_quality_count"], 1);
    assert_eq!(report["overall_trend"], "insufficient_data");
}

#[tokio::test]
async fn rate_limit_status_reports_the_callers_window() {
    let harness = harness();
    let app = app_with_limit(&harness, 5);

    send(&app, Method::GET, "/api/v1/queue", None).await;
    let (status, body) = send(&app, Method::GET, "/api/v1/rate-limit/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["remaining"], 3);
    assert_eq!(body["window_seconds"], 60);
    assert_eq!(body["client"], "unknown");
}
