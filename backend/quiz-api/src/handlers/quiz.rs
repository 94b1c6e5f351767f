use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::time::Instant;
use validator::Validate;

use crate::{
    error::QuizError,
    models::{RandomQuestionQuery, SubmitAnswerRequest},
    services::AppState,
};

fn error_response(e: QuizError) -> (StatusCode, String) {
    let status = match &e {
        QuizError::QuestionNotFound(_) | QuizError::NoQuestionAvailable(_) => {
            StatusCode::NOT_FOUND
        }
        QuizError::InvalidSelection { .. } => StatusCode::BAD_REQUEST,
        QuizError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        QuizError::StatsConflict(_) | QuizError::Persistence(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!("Quiz request failed: {}", e);
    } else {
        tracing::warn!("Quiz request rejected: {}", e);
    }

    (status, e.to_string())
}

pub async fn get_random_question(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RandomQuestionQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .quiz
        .get_random_question(&query.user_id, query.difficulty.as_deref())
        .await
        .map(|question| (StatusCode::OK, Json(question)))
        .map_err(error_response)
}

pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .quiz
        .get_question_by_id(&question_id)
        .await
        .map(|question| (StatusCode::OK, Json(question)))
        .map_err(error_response)
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Submitting answer for user={}, question={}",
        req.user_id,
        req.question_id
    );

    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let deadline = Instant::now() + state.config.submit_deadline();

    state
        .quiz
        .submit_answer_with_deadline(&req.user_id, &req.question_id, req.selected_index, deadline)
        .await
        .map(|result| (StatusCode::OK, Json(result)))
        .map_err(error_response)
}

pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .quiz
        .get_user_stats(&user_id)
        .await
        .map(|stats| (StatusCode::OK, Json(stats)))
        .map_err(error_response)
}
