#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use quiz_api::{
    config::Config,
    create_router,
    models::DomainEvent,
    services::{
        answer_ledger::InMemoryAnswerLedger,
        event_notifier::{ChannelPublisher, EventNotifier, EventPublisher},
        question_store::InMemoryQuestionStore,
        quiz_service::QuizService,
        stats_store::InMemoryStatsStore,
        AppState,
    },
    NotifyError,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<InMemoryAnswerLedger>,
    pub stats: Arc<InMemoryStatsStore>,
    pub events: Option<broadcast::Receiver<DomainEvent>>,
}

/// Broker that refuses every connection.
pub struct UnreachableBroker;

#[async_trait]
impl EventPublisher for UnreachableBroker {
    async fn publish(&self, _event: &DomainEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("connection refused".to_string()))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn build_service(
    publisher: Arc<dyn EventPublisher>,
) -> (QuizService, Arc<InMemoryAnswerLedger>, Arc<InMemoryStatsStore>) {
    let config = Config::default();
    let ledger = Arc::new(InMemoryAnswerLedger::new());
    let stats = Arc::new(InMemoryStatsStore::new());
    let service = QuizService::new(
        Arc::new(InMemoryQuestionStore::seeded()),
        ledger.clone(),
        stats.clone(),
        EventNotifier::new(publisher, config.publish_timeout()),
    );
    (service, ledger, stats)
}

fn build_app(
    publisher: Arc<dyn EventPublisher>,
    events: Option<broadcast::Receiver<DomainEvent>>,
) -> TestApp {
    init_tracing();
    let (service, ledger, stats) = build_service(publisher);
    let state = Arc::new(AppState::with_service(Config::default(), service));

    TestApp {
        router: create_router(state),
        ledger,
        stats,
        events,
    }
}

pub fn create_test_app() -> TestApp {
    let publisher = Arc::new(ChannelPublisher::new(64));
    let events = publisher.subscribe();
    build_app(publisher, Some(events))
}

pub fn create_test_app_with_unreachable_broker() -> TestApp {
    build_app(Arc::new(UnreachableBroker), None)
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn submit(
    router: &Router,
    user_id: &str,
    question_id: &str,
    selected_index: i64,
) -> (StatusCode, Value) {
    let body = serde_json::json!({
        "user_id": user_id,
        "question_id": question_id,
        "selected_index": selected_index
    });
    send(
        router,
        Request::builder()
            .method("POST")
            .uri("/api/v1/quiz/answers")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}
