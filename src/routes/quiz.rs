use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::quiz_dto::{
    ExternalResultRequest, ExternalResultResponse, GenerateQuizRequest, SubmitQuizRequest,
    SubmitQuizResponse,
};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> crate::error::Result<Response> {
    let quizzes = state.quiz_service.list_active().await?;
    Ok(Json(quizzes).into_response())
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> crate::error::Result<Response> {
    let quiz = state.quiz_service.get_detail(quiz_id).await?;
    Ok(Json(quiz).into_response())
}

#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let quiz = state.quiz_service.generate_custom(&req).await?;
    Ok(Json(quiz).into_response())
}

/// The submission path: score and finalize the attempt, refresh the
/// submitter's aggregates synchronously, answer with their rank against the
/// live snapshot, and let the rank table itself converge in the background.
#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let attempt = state.attempt_service.submit(&req).await?;
    state.profile_service.update_stats(req.user_id).await?;
    let rank = state.rank_service.live_rank(req.user_id).await?;
    state.rank_service.refresh_async();

    Ok(Json(SubmitQuizResponse {
        attempt_id: attempt.id,
        score: attempt.score,
        total_points: attempt.total_points,
        percentage: attempt.percentage(),
        rank,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn save_external_result(
    State(state): State<AppState>,
    Json(req): Json<ExternalResultRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let attempt = state.attempt_service.save_external_result(&req).await?;

    Ok(Json(ExternalResultResponse {
        message: "Custom quiz result saved successfully".to_string(),
        attempt_id: attempt.id,
        percentage: attempt.percentage(),
    })
    .into_response())
}
