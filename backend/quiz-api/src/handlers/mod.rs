use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

pub mod quiz;

/// Stats store down means submissions fail (503). A broker outage only
/// degrades the service, since events are best-effort.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    let stats_ok = match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.quiz.check_stats_store(),
    )
    .await
    {
        Ok(Ok(())) => {
            dependencies.insert("stats_store".to_string(), json!({ "status": "healthy" }));
            true
        }
        Ok(Err(e)) => {
            dependencies.insert(
                "stats_store".to_string(),
                json!({ "status": "unhealthy", "error": e.to_string() }),
            );
            false
        }
        Err(_) => {
            dependencies.insert(
                "stats_store".to_string(),
                json!({ "status": "unhealthy", "error": "timeout after 1s" }),
            );
            false
        }
    };

    let broker_ok = match state.quiz.check_event_broker().await {
        Ok(()) => {
            dependencies.insert("event_broker".to_string(), json!({ "status": "healthy" }));
            true
        }
        Err(e) => {
            dependencies.insert(
                "event_broker".to_string(),
                json!({ "status": "unhealthy", "error": e.to_string() }),
            );
            false
        }
    };

    let (status_code, status) = match (stats_ok, broker_ok) {
        (true, true) => (StatusCode::OK, "healthy"),
        (true, false) => (StatusCode::OK, "degraded"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "quiz-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth (`username:password` from config)
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
