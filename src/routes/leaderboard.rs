use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[axum::debug_handler]
pub async fn global_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> crate::error::Result<Response> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let leaderboard = state.leaderboard_service.global(limit).await?;
    Ok(Json(leaderboard).into_response())
}

#[axum::debug_handler]
pub async fn quiz_leaderboard(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    Query(query): Query<LeaderboardQuery>,
) -> crate::error::Result<Response> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let leaderboard = state.leaderboard_service.for_quiz(quiz_id, limit).await?;
    Ok(Json(leaderboard).into_response())
}
