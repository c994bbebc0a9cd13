use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::dto::leaderboard_dto::SchedulerActionRequest;
use crate::AppState;

#[axum::debug_handler]
pub async fn scheduler_status(State(state): State<AppState>) -> crate::error::Result<Response> {
    Ok(Json(state.scheduler.status()).into_response())
}

#[axum::debug_handler]
pub async fn scheduler_control(
    State(state): State<AppState>,
    Json(req): Json<SchedulerActionRequest>,
) -> crate::error::Result<Response> {
    match req.action.as_str() {
        "start" => {
            state.scheduler.start();
            Ok(Json(json!({ "message": "Scheduler started successfully" })).into_response())
        }
        "stop" => {
            state.scheduler.stop();
            Ok(Json(json!({ "message": "Scheduler stopped successfully" })).into_response())
        }
        _ => Err(crate::error::Error::BadRequest(
            "Invalid action. Use \"start\" or \"stop\"".to_string(),
        )),
    }
}
