use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::leaderboard_dto::ProfileResponse;
use crate::AppState;

#[axum::debug_handler]
pub async fn user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> crate::error::Result<Response> {
    let profile = state.profile_service.profile_view(user_id).await?;
    let recent_attempts = state.attempt_service.recent_completed(user_id, 10).await?;

    Ok(Json(ProfileResponse {
        profile,
        recent_attempts,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn list_user_attempts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> crate::error::Result<Response> {
    let attempts = state.attempt_service.list_for_user(user_id).await?;
    Ok(Json(attempts).into_response())
}
