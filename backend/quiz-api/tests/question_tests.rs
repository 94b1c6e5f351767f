mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};

#[tokio::test]
async fn test_get_question_by_id() {
    let app = common::create_test_app();

    let (status, json) = common::get(&app.router, "/api/v1/quiz/questions/q2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "q2");
    assert_eq!(json["difficulty"], "medium");
    assert_eq!(json["options"].as_array().unwrap().len(), 4);

    let (status, _) = common::get(&app.router, "/api/v1/quiz/questions/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_random_question_by_difficulty() {
    let app = common::create_test_app();

    let (status, json) = common::get(
        &app.router,
        "/api/v1/quiz/questions/random?user_id=u1&difficulty=easy",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "q1");

    let (status, json) =
        common::get(&app.router, "/api/v1/quiz/questions/random?user_id=u1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["id"] == "q1" || json["id"] == "q2");

    let (status, _) = common::get(
        &app.router,
        "/api/v1/quiz/questions/random?user_id=u1&difficulty=nightmare",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_broker_outage_as_degraded() {
    let app = common::create_test_app();
    let (status, json) = common::get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    let app = common::create_test_app_with_unreachable_broker();
    let (status, json) = common::get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["dependencies"]["event_broker"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_require_basic_auth() {
    let app = common::create_test_app();

    let (status, _) = common::get(&app.router, "/metrics").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let credentials = general_purpose::STANDARD.encode("admin:changeme");
    let (status, _) = common::send(
        &app.router,
        Request::builder()
            .uri("/metrics")
            .header(header::AUTHORIZATION, format!("Basic {}", credentials))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    use tower::ServiceExt;

    let app = common::create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/quiz/questions/q1")
                .header("x-trace-id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-trace-id"], "trace-123");
}
