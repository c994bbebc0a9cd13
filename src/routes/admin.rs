use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use chrono::{NaiveDate, TimeZone, Utc};
use validator::Validate;

use crate::dto::quiz_dto::{CleanupRequest, CleanupResponse};
use crate::AppState;

/// Removes attempts started before the cutoff, then rebuilds every profile
/// and the rank table so nothing keeps a rank it no longer qualifies for.
#[axum::debug_handler]
pub async fn cleanup_quiz_data(
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let cutoff_date = NaiveDate::parse_from_str(&req.cutoff_date, "%Y-%m-%d").map_err(|_| {
        crate::error::Error::BadRequest("Invalid date format. Use YYYY-MM-DD".to_string())
    })?;
    let cutoff = Utc
        .from_utc_datetime(&cutoff_date.and_hms_opt(0, 0, 0).unwrap_or_default());

    let (deleted_attempts, deleted_answers) =
        state.attempt_service.delete_started_before(cutoff).await?;
    let profiles_updated = state.profile_service.refresh_all().await?;
    state.rank_service.recompute_all().await?;

    tracing::info!(
        deleted_attempts,
        deleted_answers,
        profiles_updated,
        "quiz data cleanup complete"
    );

    Ok(Json(CleanupResponse {
        message: format!(
            "Successfully cleaned up quiz data prior to {}",
            req.cutoff_date
        ),
        deleted_attempts,
        deleted_answers,
        profiles_updated,
    })
    .into_response())
}
